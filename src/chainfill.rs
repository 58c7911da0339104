extern crate clap;
use clap::*;

mod cmd_chainfill;

fn main() -> anyhow::Result<()> {
    let app = Command::new("chainfill")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`chainfill` - Gap-filling chainer and chain cleaner")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::Count)
                .help("More log output; repeat for more (-v info, -vv debug, -vvv trace)"),
        )
        .subcommand(cmd_chainfill::align::make_subcommand())
        .subcommand(cmd_chainfill::clean::make_subcommand())
        .subcommand(cmd_chainfill::rescore::make_subcommand())
        .after_help(
            r###"Subcommands:

* align   - Seed, chain and gap-fill every target/query pair
* clean   - Remove chain-breaking suspects using the net
* rescore - Recompute chain scores from the sequences

Set RUST_LOG to override the log level chosen by -v.

"###,
        );

    let matches = app.get_matches();

    let level = match matches.get_count("verbose") {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();

    match matches.subcommand() {
        Some(("align", sub_matches)) => cmd_chainfill::align::execute(sub_matches),
        Some(("clean", sub_matches)) => cmd_chainfill::clean::execute(sub_matches),
        Some(("rescore", sub_matches)) => cmd_chainfill::rescore::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}

use anyhow::Result;
use chainfill::libs::chain::{read_chains, ScoreContext};
use chainfill::libs::seq::{read_fasta, SeqStore};
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::{info, warn};
use std::io::Write;

pub fn make_subcommand() -> Command {
    Command::new("rescore")
        .about("Recompute chain scores from the sequences")
        .after_help(
            r###"
Each score is the sum of the block substitution scores minus the gap costs.
With --local, the score is the best stretch of the chain instead, where the
running score restarts whenever a gap would take it below zero.

Chains keep their order and ids.

Examples:
  chainfill rescore in.chain target.fa query.fa --linear-gap loose
"###,
        )
        .arg(
            Arg::new("chain")
                .required(true)
                .num_args(1)
                .index(1)
                .help("Input chain file"),
        )
        .arg(
            Arg::new("target")
                .required(true)
                .num_args(1)
                .index(2)
                .help("Target FASTA file"),
        )
        .arg(
            Arg::new("query")
                .required(true)
                .num_args(1)
                .index(3)
                .help("Query FASTA file"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .num_args(1)
                .default_value("stdout")
                .help("Output chain file"),
        )
        .args(super::scoring_args())
        .arg(
            Arg::new("local")
                .long("local")
                .action(ArgAction::SetTrue)
                .help("Write the local score"),
        )
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    let local = args.get_flag("local");
    let (gap_calc, matrix) = super::scoring(args)?;

    let mut chains = read_chains(chainfill::reader(args.get_one::<String>("chain").unwrap())?)?;
    let mut seqs = SeqStore::new(
        read_fasta(args.get_one::<String>("target").unwrap())?,
        read_fasta(args.get_one::<String>("query").unwrap())?,
    );
    for chain in &chains {
        seqs.prepare_query(&chain.header.q_name, chain.header.q_strand)?;
    }

    let mut changed = 0;
    for chain in chains.iter_mut() {
        let h = &chain.header;
        let ctx = ScoreContext::new(
            seqs.query(&h.q_name, h.q_strand)?,
            seqs.target(&h.t_name)?,
            &matrix,
            &gap_calc,
        );
        let score = if local {
            ctx.calc_score_local(&chain.blocks)
        } else {
            ctx.calc_score(&chain.blocks)
        };
        if !local && chain.header.score != 0.0 && (score - chain.header.score).abs() > 0.5 {
            warn!(
                "Chain {}: score {} in the file, {} from the sequences",
                chain.header.id, chain.header.score, score
            );
        }
        if score != chain.header.score {
            changed += 1;
        }
        chain.header.score = score;
    }
    info!("{} of {} scores changed", changed, chains.len());

    let mut writer = chainfill::writer(args.get_one::<String>("output").unwrap())?;
    for chain in &chains {
        chain.write(&mut writer)?;
    }
    writer.flush()?;

    Ok(())
}

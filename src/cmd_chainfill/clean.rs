use anyhow::Result;
use chainfill::libs::chain::{read_chains, Chain};
use chainfill::libs::clean::{read_nets, ChainCleaner, CleanParams};
use chainfill::libs::seq::{read_fasta, SeqStore};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::info;
use std::io::Write;

pub fn make_subcommand() -> Command {
    Command::new("clean")
        .about("Remove chain-breaking suspects using the net")
        .after_help(
            r###"
A suspect is the stretch of a higher-scoring (breaking) chain that sits
between two consecutive pieces of a lower-scoring (broken) chain in the net.
It is cut out into a chain of its own when the broken chain's pieces around
it score much better than the suspect does locally.

<in.net> must be the target-side net of <in.chain>; a chain id in the net
that is missing from <in.chain> is an error.

The --suspects file has one line per suspect:
  chrom start end breakingId brokenId newChainId
  localScore leftScore rightScore fillScore ratioL ratioR ratioFold pair
  suspectBases leftGap rightGap leftLocalScore rightLocalScore

Examples:
  chainfill clean in.chain in.net target.fa query.fa -o out.chain
  chainfill clean in.chain in.net target.fa query.fa --report-only --suspects s.bed
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
            Arg::new("net")
                .required(true)
                .num_args(1)
                .index(2)
                .help("Target-side net of the input chains"),
        )
        .arg(
            Arg::new("target")
                .required(true)
                .num_args(1)
                .index(3)
                .help("Target FASTA file"),
        )
        .arg(
            Arg::new("query")
                .required(true)
                .num_args(1)
                .index(4)
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
        .arg(
            Arg::new("suspects")
                .long("suspects")
                .num_args(1)
                .help("Write the removed suspects to this file"),
        )
        .args(super::scoring_args())
        .arg(
            Arg::new("lr_fold_threshold")
                .long("lr-fold-threshold")
                .value_parser(value_parser!(f64))
                .default_value("2.5")
                .help("Minimum ratio of each flanking piece's score to the suspect's"),
        )
        .arg(
            Arg::new("fold_threshold")
                .long("fold-threshold")
                .value_parser(value_parser!(f64))
                .default_value("0")
                .help("Minimum ratio of the joined pieces' score to the suspect's"),
        )
        .arg(
            Arg::new("max_suspect_bases")
                .long("max-suspect-bases")
                .value_parser(value_parser!(u64))
                .help("Keep suspects with more aligned bases [default: unlimited]"),
        )
        .arg(
            Arg::new("max_suspect_score")
                .long("max-suspect-score")
                .value_parser(value_parser!(f64))
                .default_value("100000")
                .help("Keep suspects with a higher local score"),
        )
        .arg(
            Arg::new("min_broken_chain_score")
                .long("min-broken-chain-score")
                .value_parser(value_parser!(f64))
                .default_value("50000")
                .help("Ignore breaks of chains scoring less"),
        )
        .arg(
            Arg::new("min_lr_gap_size")
                .long("min-lr-gap-size")
                .value_parser(value_parser!(u64))
                .default_value("0")
                .help("Minimum size of both gaps around a suspect"),
        )
        .arg(
            Arg::new("do_pairs")
                .long("do-pairs")
                .action(ArgAction::SetTrue)
                .help("Also test adjacent breaks together"),
        )
        .arg(
            Arg::new("lr_fold_threshold_pairs")
                .long("lr-fold-threshold-pairs")
                .value_parser(value_parser!(f64))
                .default_value("10")
                .help("--lr-fold-threshold for pairs"),
        )
        .arg(
            Arg::new("max_pair_distance")
                .long("max-pair-distance")
                .value_parser(value_parser!(u64))
                .default_value("10000")
                .help("Largest distance between the suspects of a pair"),
        )
        .arg(
            Arg::new("report_only")
                .long("report-only")
                .action(ArgAction::SetTrue)
                .help("Only report what would be removed; chains are written unchanged"),
        )
}

/// Every chain's sequences must be loaded and match the sizes in its header.
fn check_sequences(seqs: &SeqStore, chains: &[Chain]) -> Result<()> {
    for chain in chains {
        let h = &chain.header;
        let t_len = seqs.target(&h.t_name)?.len() as u64;
        let q_len = seqs.query(&h.q_name, h.q_strand)?.len() as u64;
        if t_len != h.t_size || q_len != h.q_size {
            anyhow::bail!(
                "Chain {}: sizes {}:{} and {}:{} do not match the sequences ({} and {})",
                h.id,
                h.t_name,
                h.t_size,
                h.q_name,
                h.q_size,
                t_len,
                q_len
            );
        }
    }
    Ok(())
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    let defaults = CleanParams::default();
    let params = CleanParams {
        lr_fold_threshold: *args.get_one::<f64>("lr_fold_threshold").unwrap(),
        fold_threshold: *args.get_one::<f64>("fold_threshold").unwrap(),
        max_suspect_bases: args
            .get_one::<u64>("max_suspect_bases")
            .copied()
            .unwrap_or(defaults.max_suspect_bases),
        max_suspect_score: *args.get_one::<f64>("max_suspect_score").unwrap(),
        min_broken_chain_score: *args.get_one::<f64>("min_broken_chain_score").unwrap(),
        min_lr_gap_size: *args.get_one::<u64>("min_lr_gap_size").unwrap(),
        do_pairs: args.get_flag("do_pairs"),
        lr_fold_threshold_pairs: *args.get_one::<f64>("lr_fold_threshold_pairs").unwrap(),
        max_pair_distance: *args.get_one::<u64>("max_pair_distance").unwrap(),
        report_only: args.get_flag("report_only"),
    };
    let (gap_calc, matrix) = super::scoring(args)?;

    let chains = read_chains(chainfill::reader(args.get_one::<String>("chain").unwrap())?)?;
    let nets = read_nets(chainfill::reader(args.get_one::<String>("net").unwrap())?)?;
    info!("{} chains, {} nets", chains.len(), nets.len());

    let mut seqs = SeqStore::new(
        read_fasta(args.get_one::<String>("target").unwrap())?,
        read_fasta(args.get_one::<String>("query").unwrap())?,
    );
    for chain in &chains {
        seqs.prepare_query(&chain.header.q_name, chain.header.q_strand)?;
    }
    check_sequences(&seqs, &chains)?;

    let cleaner = ChainCleaner {
        params,
        seqs: &seqs,
        matrix: &matrix,
        gap_calc: &gap_calc,
    };
    let outcome = cleaner.clean(chains, &nets)?;
    info!(
        "{} chains written, {} suspects reported",
        outcome.chains.len(),
        outcome.suspects.len()
    );

    let mut writer = chainfill::writer(args.get_one::<String>("output").unwrap())?;
    for chain in &outcome.chains {
        chain.write(&mut writer)?;
    }
    writer.flush()?;

    if let Some(path) = args.get_one::<String>("suspects") {
        let mut writer = chainfill::writer(path)?;
        for report in &outcome.suspects {
            report.write(&mut writer)?;
        }
        writer.flush()?;
    }

    Ok(())
}

use anyhow::Result;
use chainfill::libs::align::{AlignParams, AlignStats, Aligner, BandedAligner, KmerSeeder};
use chainfill::libs::chain::{sort_chains, Chain, GapCalc, KdChainer};
use chainfill::libs::seq::read_fasta;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::info;
use rayon::prelude::*;
use std::io::Write;

pub fn make_subcommand() -> Command {
    Command::new("align")
        .about("Seed, chain and gap-fill every target/query pair")
        .after_help(
            r###"
Processing:
  1. Find gapless k-mer seeds and chain them with cheap gap costs.
  2. Extend around and between the chained blocks with banded alignment.
  3. Search the gaps and ends of good chains again with smaller seeds
     (--expand-window 0 turns this off).
  4. Rechain everything with the real gap costs and close small
     double-sided gaps.
  5. With --rna, slide target-side gaps onto splice sites.

Chains are written best first and numbered from 1.

Examples:
  chainfill align target.fa query.fa -o out.chain
  chainfill align target.fa query.fa --single-strand --expand-window 0
  chainfill align target.fa query.fa --dyna-limit-t 4 --dyna-limit-q 2
"###,
        )
        .arg(
            Arg::new("target")
                .required(true)
                .num_args(1)
                .index(1)
                .help("Target FASTA file, .gz allowed"),
        )
        .arg(
            Arg::new("query")
                .required(true)
                .num_args(1)
                .index(2)
                .help("Query FASTA file, .gz allowed"),
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
            Arg::new("weight")
                .long("weight")
                .value_parser(value_parser!(usize))
                .default_value("11")
                .help("Seed k-mer size"),
        )
        .arg(
            Arg::new("min_gapless")
                .long("min-gapless")
                .value_parser(value_parser!(f64))
                .default_value("2200")
                .help("Minimum score of a gapless seed extension"),
        )
        .arg(
            Arg::new("max_drop")
                .long("max-drop")
                .value_parser(value_parser!(f64))
                .default_value("1500")
                .help("X-drop of the gapless extension"),
        )
        .arg(
            Arg::new("min_chain")
                .long("min-chain")
                .value_parser(value_parser!(f64))
                .default_value("0")
                .help("Minimum score of a coarse chain"),
        )
        .arg(
            Arg::new("min_score")
                .long("min-score")
                .value_parser(value_parser!(f64))
                .default_value("4000")
                .help("Minimum score of an output chain"),
        )
        .arg(
            Arg::new("max_extend")
                .long("max-extend")
                .value_parser(value_parser!(u64))
                .default_value("5000")
                .help("Longest stretch given to banded extension"),
        )
        .arg(
            Arg::new("max_band_gap")
                .long("max-band-gap")
                .value_parser(value_parser!(usize))
                .default_value("50")
                .help("Band half-width"),
        )
        .arg(
            Arg::new("shrink")
                .long("shrink")
                .value_parser(value_parser!(u64))
                .default_value("200")
                .help("Bases trimmed off each coarse block before extension"),
        )
        .arg(
            Arg::new("best_chain_only")
                .long("best-chain-only")
                .action(ArgAction::SetTrue)
                .help("Extend only the best coarse chain"),
        )
        .arg(
            Arg::new("max_chains_to_explore")
                .long("max-chains-to-explore")
                .value_parser(value_parser!(usize))
                .default_value("1000")
                .help("Extend at most this many coarse chains"),
        )
        .arg(
            Arg::new("expand_window")
                .long("expand-window")
                .value_parser(value_parser!(u64))
                .default_value("10000")
                .help("Largest region searched again with smaller seeds; 0 disables"),
        )
        .arg(
            Arg::new("min_expand")
                .long("min-expand")
                .value_parser(value_parser!(f64))
                .default_value("1000")
                .help("Minimum chain score for its gaps to be searched again"),
        )
        .arg(
            Arg::new("single_strand")
                .long("single-strand")
                .action(ArgAction::SetTrue)
                .help("Align the query as given only, not its reverse complement"),
        )
        .arg(
            Arg::new("no_reduce_gaps")
                .long("no-reduce-gaps")
                .action(ArgAction::SetTrue)
                .help("Keep small double-sided gaps as chained"),
        )
        .arg(
            Arg::new("rna")
                .long("rna")
                .action(ArgAction::SetTrue)
                .help("Query is mRNA; slide target-side gaps onto GT..AG splice sites"),
        )
        .arg(
            Arg::new("dyna_limit_t")
                .long("dyna-limit-t")
                .value_parser(value_parser!(u32))
                .num_args(1)
                .help("Ignore seeds on target bases already covered this many times"),
        )
        .arg(
            Arg::new("dyna_limit_q")
                .long("dyna-limit-q")
                .value_parser(value_parser!(u32))
                .num_args(1)
                .help("Ignore seeds on query bases already covered this many times, per strand"),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .short('p')
                .value_parser(value_parser!(usize))
                .default_value("1")
                .help("Number of threads"),
        )
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    let params = AlignParams {
        weight: *args.get_one::<usize>("weight").unwrap(),
        min_gapless: *args.get_one::<f64>("min_gapless").unwrap(),
        max_drop: *args.get_one::<f64>("max_drop").unwrap(),
        min_chain: *args.get_one::<f64>("min_chain").unwrap(),
        min_score: *args.get_one::<f64>("min_score").unwrap(),
        max_extend: *args.get_one::<u64>("max_extend").unwrap(),
        max_band_gap: *args.get_one::<usize>("max_band_gap").unwrap(),
        shrink: *args.get_one::<u64>("shrink").unwrap(),
        best_chain_only: args.get_flag("best_chain_only"),
        max_chains_to_explore: *args.get_one::<usize>("max_chains_to_explore").unwrap(),
        expand_window: *args.get_one::<u64>("expand_window").unwrap(),
        min_expand: *args.get_one::<f64>("min_expand").unwrap(),
        both_strands: !args.get_flag("single_strand"),
        reduce_gaps: !args.get_flag("no_reduce_gaps"),
        rna: args.get_flag("rna"),
        dyna_limit_t: args.get_one::<u32>("dyna_limit_t").copied(),
        dyna_limit_q: args.get_one::<u32>("dyna_limit_q").copied(),
    };
    if params.weight == 0 {
        anyhow::bail!("--weight must be at least 1");
    }
    let parallel = *args.get_one::<usize>("parallel").unwrap();

    let (gap_calc, matrix) = super::scoring(args)?;
    let cheap_gap = GapCalc::cheap();

    let targets = read_fasta(args.get_one::<String>("target").unwrap())?;
    let queries = read_fasta(args.get_one::<String>("query").unwrap())?;
    info!("{} targets, {} queries", targets.len(), queries.len());

    let seeder = KmerSeeder::default();
    let aligner = Aligner {
        params,
        matrix: &matrix,
        gap_calc: &gap_calc,
        cheap_gap: &cheap_gap,
        seeder: &seeder,
        chainer: &KdChainer,
        extender: &BandedAligner,
    };

    let pairs: Vec<(usize, usize)> = (0..targets.len())
        .flat_map(|t| (0..queries.len()).map(move |q| (t, q)))
        .collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(parallel)
        .build()?;
    let results = pool.install(|| {
        pairs
            .par_iter()
            .map(|&(t, q)| {
                let (t_name, target) = &targets[t];
                let (q_name, query) = &queries[q];
                let mut stats = AlignStats::default();
                let chains = aligner.align(q_name, query, t_name, target, &mut stats)?;
                info!("{} vs {}: {} chains", q_name, t_name, chains.len());
                Ok((chains, stats))
            })
            .collect::<chainfill::libs::Result<Vec<_>>>()
    })?;

    let mut all_chains: Vec<Chain> = Vec::new();
    let mut stats = AlignStats::default();
    for (chains, pair_stats) in results {
        all_chains.extend(chains);
        stats += pair_stats;
    }
    sort_chains(&mut all_chains);
    for (i, chain) in all_chains.iter_mut().enumerate() {
        chain.header.id = (i + 1) as u64;
    }
    info!(
        "{} chains; {} seeds, {} regions searched again over {} cells",
        all_chains.len(),
        stats.seeds,
        stats.regions_expanded,
        stats.expanded_area
    );

    let mut writer = chainfill::writer(args.get_one::<String>("output").unwrap())?;
    for chain in &all_chains {
        chain.write(&mut writer)?;
    }
    writer.flush()?;

    Ok(())
}

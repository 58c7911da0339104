pub mod align;
pub mod clean;
pub mod rescore;

use chainfill::libs::chain::{GapCalc, SubMatrix};
use clap::{Arg, ArgMatches};

/// `--linear-gap` and `--matrix`, shared by every subcommand that scores.
pub fn scoring_args() -> Vec<Arg> {
    vec![
        Arg::new("linear_gap")
            .long("linear-gap")
            .num_args(1)
            .default_value("medium")
            .help("Gap costs: medium, loose, cheap or a UCSC linear-gap file"),
        Arg::new("matrix")
            .long("matrix")
            .num_args(1)
            .default_value("default")
            .help("Substitution matrix: default, hoxd55 or a lastz-style matrix file"),
    ]
}

pub fn scoring(args: &ArgMatches) -> anyhow::Result<(GapCalc, SubMatrix)> {
    let gap_calc = GapCalc::from_name(args.get_one::<String>("linear_gap").unwrap())?;
    let matrix = SubMatrix::from_name(args.get_one::<String>("matrix").unwrap())?;
    Ok((gap_calc, matrix))
}

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn random_seq(len: usize, seed: u64) -> String {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            b"ACGT"[(state >> 33) as usize % 4] as char
        })
        .collect()
}

fn rev_comp(seq: &str) -> String {
    seq.chars()
        .rev()
        .map(|c| match c {
            'A' => 'T',
            'C' => 'G',
            'G' => 'C',
            'T' => 'A',
            other => other,
        })
        .collect()
}

#[test]
fn command_rescore() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let seq = random_seq(1000, 11);
    let target = temp.path().join("t.fa");
    let query = temp.path().join("q.fa");
    let chain = temp.path().join("in.chain");
    fs::write(&target, format!(">chr1\n{}\n", seq))?;
    fs::write(&query, format!(">chrQ\n{}\n", seq))?;
    fs::write(
        &chain,
        "chain 0 chr1 1000 + 150 200 chrQ 1000 + 150 200 7\n50\n\n",
    )?;

    let mut cmd = Command::cargo_bin("chainfill")?;
    cmd.arg("rescore")
        .arg(&chain)
        .arg(&target)
        .arg(&query)
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "chain 5000 chr1 1000 + 150 200 chrQ 1000 + 150 200 7\n50\n",
        ));

    Ok(())
}

#[test]
fn command_rescore_local() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let seq = random_seq(1000, 11);
    let target = temp.path().join("t.fa");
    let query = temp.path().join("q.fa");
    let chain = temp.path().join("in.chain");
    fs::write(&target, format!(">chr1\n{}\n", seq))?;
    fs::write(&query, format!(">chrQ\n{}\n", seq))?;
    // A 10 bp block, a 200 bp double-sided gap, then a 5 bp block
    fs::write(
        &chain,
        "chain 0 chr1 1000 + 0 215 chrQ 1000 + 0 215 1\n10 200 200\n5\n\n",
    )?;

    let mut cmd = Command::cargo_bin("chainfill")?;
    let output = cmd
        .arg("rescore")
        .arg(&chain)
        .arg(&target)
        .arg(&query)
        .arg("--local")
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    // The gap costs more than the first block is worth
    assert!(stdout.starts_with("chain 1000 "));

    let mut cmd = Command::cargo_bin("chainfill")?;
    let output = cmd
        .arg("rescore")
        .arg(&chain)
        .arg(&target)
        .arg(&query)
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    let score: f64 = stdout.split_whitespace().nth(1).unwrap().parse()?;
    assert!(score < 1000.0);

    Ok(())
}

#[test]
fn command_rescore_minus_strand() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let seq = random_seq(1000, 11);
    let target = temp.path().join("t.fa");
    let query = temp.path().join("q.fa.gz");
    let chain = temp.path().join("in.chain");
    fs::write(&target, format!(">chr1\n{}\n", seq))?;

    let file = fs::File::create(&query)?;
    let mut enc = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    std::io::Write::write_all(&mut enc, format!(">chrQ\n{}\n", rev_comp(&seq)).as_bytes())?;
    enc.finish()?;

    fs::write(
        &chain,
        "chain 0 chr1 1000 + 0 100 chrQ 1000 - 0 100 1\n100\n\n",
    )?;

    let mut cmd = Command::cargo_bin("chainfill")?;
    cmd.arg("rescore")
        .arg(&chain)
        .arg(&target)
        .arg(&query)
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "chain 10000 chr1 1000 + 0 100 chrQ 1000 - 0 100 1\n",
        ));

    Ok(())
}

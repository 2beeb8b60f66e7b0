use std::fs;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::str::FromStr;

use data_encoding::HEXLOWER;

pub fn setup() -> PathBuf {
    let results_dir_path = PathBuf::from_str("./target/results/").unwrap();
    if !results_dir_path.exists() {
        fs::create_dir_all(&results_dir_path)
            .unwrap_or_else(|_| panic!("Failed to create results directory: {:?}", results_dir_path));
    }
    results_dir_path
}

#[allow(dead_code)]
pub fn read_lines(path: &PathBuf) -> Result<Vec<String>, anyhow::Error> {
    let reader = BufReader::new(File::open(path)?);
    let lines = reader.lines().map(|x| x.unwrap()).collect();
    Ok(lines)
}

#[allow(dead_code)]
pub fn write_lines(path: &PathBuf, lines: &[&str]) -> Result<(), anyhow::Error> {
    let mut file = File::create(path)?;
    for line in lines {
        writeln!(file, "{line}")?;
    }
    Ok(())
}

#[allow(dead_code)]
pub fn temp_file_name(dir: &PathBuf) -> PathBuf {
    let mut result = dir.clone();
    let name = HEXLOWER.encode(&rand::random::<[u8; 16]>());
    result.push(name);
    result
}

use schema::{MoveRecord, SpeciesRecord};
use serde::de::DeserializeOwned;
use std::env;
use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::Path;

const SPECIES_FILE: &str = "data/species.ron";
const MOVES_FILE: &str = "data/moves.ron";

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed={}", SPECIES_FILE);
    println!("cargo:rerun-if-changed={}", MOVES_FILE);

    let species: Vec<SpeciesRecord> = load_ron(SPECIES_FILE)?;
    let moves: Vec<MoveRecord> = load_ron(MOVES_FILE)?;

    let mut species_map = phf_codegen::Map::new();
    for record in &species {
        species_map.entry(record.id.as_str(), &byte_literal(&record.to_bytes()?));
    }

    let mut move_map = phf_codegen::Map::new();
    for record in &moves {
        move_map.entry(record.id.as_str(), &byte_literal(&record.to_bytes()?));
    }

    let out_path = Path::new(&env::var("OUT_DIR")?).join("compiled_dex.rs");
    let mut file = fs::File::create(out_path)?;
    writeln!(
        file,
        "static SPECIES_BLOBS: phf::Map<&'static str, &'static [u8]> = {};",
        species_map.build()
    )?;
    writeln!(
        file,
        "static MOVE_BLOBS: phf::Map<&'static str, &'static [u8]> = {};",
        move_map.build()
    )?;

    Ok(())
}

fn load_ron<T: DeserializeOwned>(path: &str) -> Result<Vec<T>, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let records = ron::from_str(&text).map_err(|e| format!("{}: {}", path, e))?;
    Ok(records)
}

fn byte_literal(bytes: &[u8]) -> String {
    format!("&{:?}", bytes)
}

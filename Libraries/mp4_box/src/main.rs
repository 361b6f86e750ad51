use std::env;
use std::fs::File;
use std::io::BufReader;
use std::process;

use mp4_box::format_fourcc;
use mp4_box::reader::{read_moov, read_top_level_boxes};
use mp4_box::sample_table::SampleTable;

fn main() {
    let args: Vec<String> = env::args().collect();

    match args.as_slice() {
        [_, flag, filename] if flag == "--tracks" => run_tracks_mode(filename),
        [_, filename] => run_file_mode(filename),
        _ => {
            eprintln!("Usage: {} <mp4_file> | --tracks <mp4_file>", args[0]);
            process::exit(1);
        }
    }
}

fn open(filename: &str) -> BufReader<File> {
    match File::open(filename) {
        Ok(f) => BufReader::new(f),
        Err(e) => {
            eprintln!("Failed to open file '{}': {}", filename, e);
            process::exit(1);
        }
    }
}

fn run_file_mode(filename: &str) {
    let mut reader = open(filename);

    let boxes = match read_top_level_boxes(&mut reader) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Failed to parse MP4 boxes: {}", e);
            process::exit(1);
        }
    };

    println!("Parsed {} top-level boxes from '{}':\n", boxes.len(), filename);
    for (i, mp4_box) in boxes.iter().enumerate() {
        println!("Box {}:\n{:#?}\n", i + 1, mp4_box);
    }
}

fn run_tracks_mode(filename: &str) {
    let mut reader = open(filename);

    let moov = match read_moov(&mut reader) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Failed to read moov: {}", e);
            process::exit(1);
        }
    };

    println!("{} track(s) in '{}':", moov.traks.len(), filename);
    for trak in &moov.traks {
        let mdhd = &trak.mdia.mdhd;
        let format = trak
            .mdia
            .minf
            .stbl
            .stsd
            .entries
            .first()
            .map(|e| format_fourcc(&e.format))
            .unwrap_or_else(|| "none".to_string());

        match SampleTable::from_stbl(&trak.mdia.minf.stbl) {
            Ok(table) => {
                let sync = table.samples.iter().filter(|s| s.is_sync).count();
                println!(
                    "  #{} {} ({}) timescale {} duration {:.3}s, {} samples ({} sync), rotation {:?}",
                    trak.tkhd.track_id,
                    format_fourcc(&trak.mdia.hdlr.handler_type),
                    format,
                    mdhd.timescale,
                    mdhd.duration as f64 / mdhd.timescale.max(1) as f64,
                    table.len(),
                    sync,
                    trak.tkhd.rotation()
                );
            }
            Err(e) => println!("  #{} invalid sample table: {}", trak.tkhd.track_id, e),
        }
    }
}

pub use anyhow::{Result as R, anyhow};
use wavcue_lib::*;

fn main() -> R<()> {
    let mut args = std::env::args().skip(1);
    let Some(input) = args.next() else {
        eprintln!("usage: wavcue <input.wav> [output.wav]");
        std::process::exit(2);
    };

    let reader = WavFileReader::open(&input)?;
    println!("File: {}", input);
    println!("Declared rate: {} Hz", reader.sample_rate());
    println!("Channels: {}", reader.channels());
    println!("Bit depth: {}", reader.bits_per_sample());
    println!("Audio bytes: {}", reader.total_audio_length());
    println!("Duration: {:.4} s", reader.duration());

    let metadata = reader.read_metadata();
    println!(
        "Metadata: {} {} b{} {} c{} v{}-{}",
        metadata.language,
        metadata.version,
        metadata.book_number,
        metadata.slug,
        metadata.chapter,
        metadata.startv,
        metadata.endv
    );

    let mut markers = metadata.markers.clone();
    markers.sort();
    println!("Markers ({}):", markers.len());
    for marker in &markers {
        println!("  {:>10}  {}", marker.location, marker.label);
    }

    // Optional second argument: rewrite through the writer, normalizing
    // the chunk layout
    if let Some(output) = args.next() {
        let wav = reader.read();
        WavFileWriter.write(&wav, &output)?;
        println!("Rewrote {}", output);
    }

    Ok(())
}

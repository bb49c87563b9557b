//! # chatstats CLI
//!
//! Command-line interface for the chatstats library.

use std::path::Path;
use std::process;
use std::time::Instant;

use clap::Parser as ClapParser;

use chatstats::ChatstatsError;
use chatstats::aggregate::{BlockArgs, BlockData, BlockEngine, BlockKey, BlockRegistry, WordStatsArgs};
use chatstats::archive::Archive;
use chatstats::cli::{Args, OutputFormat};
use chatstats::database::Database;
use chatstats::export::save_block_csv;
use chatstats::filters::Filters;
use chatstats::progress::stderr_progress;

fn main() {
    if let Err(e) = run() {
        eprintln!("❌ Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), ChatstatsError> {
    let total_start = Instant::now();
    let args = <Args as ClapParser>::parse();

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| format!("chatstats.{}", args.format.extension()));

    let keys = selected_keys(&args);

    // Print header
    println!("📈 chatstats v{}", env!("CARGO_PKG_VERSION"));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📂 Input:   {}", args.input);
    println!("💾 Output:  {}", output_path);
    println!("📄 Format:  {}", args.format);
    println!("🧮 Blocks:  {}", key_list(&keys));

    if !args.channels.is_empty() {
        println!("📺 Channels: {}", args.channels.join(", "));
    }
    if !args.authors.is_empty() {
        println!("👤 Authors: {}", args.authors.join(", "));
    }
    if let Some(ref after) = args.after {
        println!("📅 After:   {}", after);
    }
    if let Some(ref before) = args.before {
        println!("📅 Before:  {}", before);
    }
    if let Some(ref word) = args.word {
        println!("🔤 Word:    {}", word);
    }
    println!();

    // Step 1: Load the archive
    println!("⏳ Loading archive...");
    let load_start = Instant::now();
    let archive = Archive::load(&args.input)?;
    let num_messages = archive.num_messages();
    println!(
        "   Found {} messages in {} channels ({:.2}s)",
        num_messages,
        archive.channels.len(),
        load_start.elapsed().as_secs_f64()
    );

    // Step 2: Pack into the bit-level database
    println!("🗜️  Packing messages...");
    let pack_start = Instant::now();
    let database = archive.build_database_with_progress(stderr_progress())?;
    println!(
        "   {} bytes, {:.1} bits/message ({:.2}s)",
        database.stream_bytes().len(),
        database.packed_bits() as f64 / database.num_messages() as f64,
        pack_start.elapsed().as_secs_f64()
    );

    if args.stats {
        print_database_stats(&database);
    }

    // Step 3: Build the query predicate from the filter flags
    let filters = build_filters(&args, &database)?;

    // Step 4: Compute the selected blocks
    println!("🧮 Computing {} block(s)...", keys.len());
    let compute_start = Instant::now();
    let word_args = word_args(&args, &keys, &database)?;
    let mut engine = BlockEngine::new(BlockRegistry::standard(), &database)?;
    let mut results: Vec<(BlockKey, BlockData)> = Vec::with_capacity(keys.len());
    for &key in &keys {
        let block_args = if key == BlockKey::WordStats {
            word_args.clone()
        } else {
            BlockArgs::None
        };
        let data = engine.compute(key, &block_args, &database, &filters)?;
        results.push((key, data.clone()));
    }
    println!(
        "   {} computed ({:.2}s)",
        results.len(),
        compute_start.elapsed().as_secs_f64()
    );

    // Step 5: Write output in selected format
    println!("💾 Writing {}...", args.format);
    let write_start = Instant::now();
    let written = write_results(&database, &results, &output_path, args.format)?;
    println!("   Written in {:.2}s", write_start.elapsed().as_secs_f64());

    let total_time = total_start.elapsed();

    println!();
    println!("✅ Done! Output saved to {}", written.join(", "));

    // Summary
    println!();
    println!("📊 Summary:");
    println!("   Messages:  {}", num_messages);
    println!("   Blocks:    {}", results.len());
    println!("   Files:     {}", written.len());

    // Performance stats
    println!();
    println!("⚡ Performance:");
    println!("   Total time:  {:.2}s", total_time.as_secs_f64());
    let msgs_per_sec = num_messages as f64 / total_time.as_secs_f64();
    println!("   Throughput:  {:.0} messages/sec", msgs_per_sec);

    Ok(())
}

/// Expands the block selections into engine keys, first occurrence wins.
fn selected_keys(args: &Args) -> Vec<BlockKey> {
    let mut keys = Vec::new();
    for block in &args.blocks {
        for key in block.keys() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    keys
}

fn key_list(keys: &[BlockKey]) -> String {
    keys.iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Builds filters from the CLI flags, resolving names against the database.
fn build_filters(args: &Args, database: &Database) -> Result<Filters, ChatstatsError> {
    let mut filters = Filters::new(database)?;

    if !args.channels.is_empty() {
        let indexes = args
            .channels
            .iter()
            .map(|name| resolve_name(name, database.channels.iter().map(|c| c.name.as_str()), "channel"))
            .collect::<Result<Vec<u32>, _>>()?;
        filters.update_channels(indexes);
    }

    if !args.authors.is_empty() {
        let indexes = args
            .authors
            .iter()
            .map(|name| resolve_name(name, database.authors.iter().map(|a| a.name.as_str()), "author"))
            .collect::<Result<Vec<u32>, _>>()?;
        filters.update_authors(&indexes);
    }

    if let Some(ref after) = args.after {
        filters.update_start_date(after)?;
    }
    if let Some(ref before) = args.before {
        filters.update_end_date(before)?;
    }

    Ok(filters)
}

/// Finds a name in a dictionary, case-sensitively.
fn resolve_name<'a>(
    name: &str,
    mut dictionary: impl Iterator<Item = &'a str>,
    what: &str,
) -> Result<u32, ChatstatsError> {
    dictionary
        .position(|entry| entry == name)
        .map(|i| i as u32)
        .ok_or_else(|| ChatstatsError::invalid_archive(format!("no {} named '{}'", what, name)))
}

/// Resolves `--word` when the word-stats block is selected.
fn word_args(
    args: &Args,
    keys: &[BlockKey],
    database: &Database,
) -> Result<BlockArgs, ChatstatsError> {
    if !keys.contains(&BlockKey::WordStats) {
        return Ok(BlockArgs::None);
    }
    let Some(ref word) = args.word else {
        eprintln!("⚠️  word-stats needs --word <WORD>");
        return Err(ChatstatsError::invalid_block_args(
            BlockKey::WordStats.as_str(),
        ));
    };
    let word_index = resolve_name(word, database.words.iter().map(String::as_str), "word")?;
    Ok(BlockArgs::WordStats(WordStatsArgs { word_index }))
}

/// Writes the computed blocks and returns the paths written.
///
/// JSON keeps everything in one object keyed by block name. CSV is one
/// table per file; with several blocks the block name lands in the file
/// name.
fn write_results(
    database: &Database,
    results: &[(BlockKey, BlockData)],
    output_path: &str,
    format: OutputFormat,
) -> Result<Vec<String>, ChatstatsError> {
    match format {
        OutputFormat::Json => {
            let mut map = serde_json::Map::new();
            for (key, data) in results {
                map.insert(key.as_str().to_string(), serde_json::to_value(data)?);
            }
            let json = serde_json::to_string_pretty(&serde_json::Value::Object(map))?;
            std::fs::write(output_path, json)?;
            Ok(vec![output_path.to_string()])
        }
        OutputFormat::Csv => {
            let mut written = Vec::with_capacity(results.len());
            for (key, data) in results {
                let path = if results.len() == 1 {
                    output_path.to_string()
                } else {
                    per_block_path(output_path, *key)
                };
                save_block_csv(database, data, &path)?;
                written.push(path);
            }
            Ok(written)
        }
    }
}

/// Derives `dir/stem.block-key.csv` from the base output path.
fn per_block_path(output_path: &str, key: BlockKey) -> String {
    let path = Path::new(output_path);
    let stem = path
        .file_stem()
        .map_or_else(|| "chatstats".to_string(), |s| s.to_string_lossy().into_owned());
    let file = format!("{}.{}.csv", stem, key.as_str());
    path.with_file_name(file).to_string_lossy().into_owned()
}

fn print_database_stats(database: &Database) {
    println!();
    println!("📊 Database:");
    println!("   Title:     {}", database.title);
    println!("   Channels:  {}", database.channels.len());
    println!("   Authors:   {}", database.authors.len());
    println!("   Messages:  {}", database.num_messages());
    println!(
        "   Range:     {} to {} ({} days)",
        database.time.min_day.date_key(),
        database.time.max_day.date_key(),
        database.time.num_days
    );
    println!(
        "   Dictionaries: {} words, {} emojis, {} mentions, {} domains, {} languages",
        database.words.len(),
        database.emojis.len(),
        database.mentions.len(),
        database.domains.len(),
        database.languages.len()
    );
    println!();
}

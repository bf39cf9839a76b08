use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use log::info;

use wordsquare::catalog::SolutionSet;
use wordsquare::dictionary::Dictionary;
use wordsquare::enumerator::Enumerator;
use wordsquare::grid::Grid;
use wordsquare::logging;
use wordsquare::parallel::Group;
use wordsquare::search::{Cancellation, Searcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Enumerate every solution and write the catalog
    #[value(name = "find_solutions")]
    FindSolutions,
    /// Search a solved catalog for matches to a partial grid
    #[value(name = "search")]
    Search,
}

/// Word square enumerator and catalog search
#[derive(Parser, Debug)]
#[command(
    author,
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_GIT_REV"), ")"),
    about,
    long_about = None
)]
struct Cli {
    /// Mode of operation
    #[arg(long, value_enum, default_value_t = Mode::FindSolutions)]
    mode: Mode,

    /// Path to the output directory
    #[arg(long)]
    output_dir: PathBuf,

    /// Path to the word list file: one word per line, all of equal length,
    /// lowercase letters only (find_solutions mode)
    #[arg(long)]
    word_list: Option<PathBuf>,

    /// Number of enumerator partitions to run in parallel
    #[arg(long, default_value_t = 2)]
    num_partitions: usize,

    /// Path to the game state file: N lines of N cells, '_' for empty
    /// (search mode)
    #[arg(long)]
    game_state: Option<PathBuf>,

    /// Path to the solutions catalog (search mode)
    #[arg(long)]
    solutions_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

/// Entry point; delegates to [`try_main`] and reports failures on stderr
/// with a nonzero exit code so scripts can detect them.
fn main() -> ExitCode {
    if let Err(e) = try_main() {
        eprintln!("Error: {e}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn try_main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_logger(cli.debug);
    match cli.mode {
        Mode::FindSolutions => find_solutions(&cli),
        Mode::Search => search(&cli),
    }
}

/// Enumerate the full corpus across partitioned workers and write
/// `<output_dir>/solutions.textpb`.
fn find_solutions(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let word_list = cli
        .word_list
        .as_ref()
        .ok_or("--word_list is required in find_solutions mode")?;

    info!("loading words from {}", word_list.display());
    let dict = Arc::new(Dictionary::load_from_path(word_list)?);
    info!(
        "loaded {} words of length {}",
        dict.len(),
        dict.word_len()
    );

    let enumerator = Enumerator::new(Arc::clone(&dict))?;
    let partitions = enumerator.partition(cli.num_partitions)?;
    info!("created {} partitions", partitions.len());

    let mut group = Group::new(Enumerator::collect_terminals, partitions);
    group.run();
    let solutions = group.output().to_vec();
    let elapsed = group.duration();

    let set = SolutionSet {
        dictionary: dict.words().to_vec(),
        solutions,
    };
    fs::create_dir_all(&cli.output_dir)?;
    let output_path = cli.output_dir.join("solutions.textpb");
    set.write_to_path(&output_path)?;
    info!(
        "{} solutions written to {} (enumerated in {:.3}s)",
        set.solutions.len(),
        output_path.display(),
        elapsed.as_secs_f64()
    );
    Ok(())
}

/// Search a solved catalog for every square extending the stored grid and
/// write `<output_dir>/matching_solutions.txt`.
fn search(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let game_state = cli
        .game_state
        .as_ref()
        .ok_or("--game_state is required in search mode")?;
    let solutions_file = cli
        .solutions_file
        .as_ref()
        .ok_or("--solutions_file is required in search mode")?;

    info!("loading game state from {}", game_state.display());
    let grid_text = fs::read_to_string(game_state)
        .map_err(|e| format!("failed to read game state from '{}': {e}", game_state.display()))?;
    let query = Grid::from_text(&grid_text)?;
    info!("loaded game state:\n{query}");

    let set = SolutionSet::load_from_path(solutions_file)?;
    info!("loaded {} solutions", set.solutions.len());
    let searcher = Arc::new(Searcher::new(set));

    let matches = searcher.stream_matches(&query, &Cancellation::never())?;
    let matched: Vec<u32> = matches.iter().collect();
    info!("found {} matching solutions", matched.len());

    fs::create_dir_all(&cli.output_dir)?;
    let output_path = cli.output_dir.join("matching_solutions.txt");
    let mut out = BufWriter::new(fs::File::create(&output_path)?);
    for (i, index) in matched.iter().enumerate() {
        writeln!(out, "Solution {}:", i + 1)?;
        let square = &searcher.solution_set().solutions[*index as usize];
        for &row in square.words() {
            writeln!(out, "{}", searcher.solution_set().dictionary[row as usize])?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    info!("matching solutions written to {}", output_path.display());
    Ok(())
}

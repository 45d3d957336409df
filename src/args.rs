use clap::Parser;

/// Live instant-runoff elections.
///
/// Without --input, election events are read as JSON lines from the standard input and the
/// outcomes are written as JSON lines to the standard output.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON configuration: debounce delay, tiebreak rules, random seed and contest name.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
    /// (file path) A reference file containing the outcome of an election in JSON format. If provided, livevote will
    /// check that the tabulated output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the election will be written in JSON format to the given
    /// location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) If specified, the election in this file is counted once and the program exits.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (json or csv, guessed from the file extension by default) The type of the input.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (repeated) The names of the candidates of a CSV input, in the order of their ids.
    #[clap(long, value_parser)]
    pub candidate: Option<Vec<String>>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard error.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}

use clap::{Parser, ValueEnum};
use kbd_layout_parser::cfg::ParseOptions;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(version, verbatim_doc_comment)]
/// kbd-layout-dump: keyboard-layout-editor layouts from KMonad/kanata configurations
///
/// Reads defsrc, deflayer and defalias from a configuration file, together with
/// the <hardware-layout> section kept inside a #| block comment |#, and prints
/// raw data to paste into the "Raw data" tab of
/// http://www.keyboard-layout-editor.com/
pub struct Args {
    /// Configuration file to read.
    #[arg(value_name = "CFG")]
    pub cfg: PathBuf,

    /// Write the output to this file instead of stdout.
    #[arg(short, long, conflicts_with = "write")]
    pub output: Option<PathBuf>,

    /// Write the output next to the configuration file, as <CFG>.kle.txt or
    /// <CFG>.layout.json depending on the format.
    #[arg(short, long, verbatim_doc_comment)]
    pub write: bool,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Kle)]
    pub format: OutputFormat,

    /// Layer token that marks a key without a function. It is rendered as an
    /// empty label, like `_`.
    #[arg(long, default_value = "XX", verbatim_doc_comment)]
    pub blank_token: String,

    /// Keep key names as written instead of translating them to keycap
    /// labels, e.g. keep `spc` instead of `Space`.
    #[arg(long, verbatim_doc_comment)]
    pub raw_labels: bool,

    /// Validate configuration file and exit
    #[arg(long, verbatim_doc_comment)]
    pub check: bool,

    /// Disable logging, except for errors. Takes precedent over debug and trace.
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    pub debug: bool,

    /// Enable trace logging; implies --debug as well.
    #[arg(short, long)]
    pub trace: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// keyboard-layout-editor raw data
    Kle,
    /// The composed layout as a JSON document
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Kle => "kle.txt",
            OutputFormat::Json => "layout.json",
        }
    }
}

impl Args {
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            blank_token: self.blank_token.clone(),
            translate_keys: !self.raw_labels,
            ..Default::default()
        }
    }

    /// Where to write the output. `None` means stdout.
    pub fn output_path(&self) -> Option<PathBuf> {
        match (&self.output, self.write) {
            (Some(path), _) => Some(path.clone()),
            (None, true) => Some(derived_output_path(&self.cfg, self.format)),
            (None, false) => None,
        }
    }
}

/// `board.kbd` becomes `board.kbd.kle.txt` or `board.kbd.layout.json`.
pub fn derived_output_path(cfg: &Path, format: OutputFormat) -> PathBuf {
    let mut name = cfg.as_os_str().to_owned();
    name.push(".");
    name.push(format.extension());
    PathBuf::from(name)
}

//! CLI Argument Parsing
//!
//! Parses command-line arguments with pico-args. Flags are
//! consumed first; whatever remains is a template file unless
//! it looks like a flag, in which case parsing fails.
//!

use std::ffi::OsString;

// ------------------------------------------------------------- Public Types

/// Parsed arguments for the `yate` binary.
///
#[derive(Debug, Default, PartialEq)]
pub struct Args {
    /// Template files, in the order given.
    ///
    pub files: Vec<String>,

    /// Emit a CommonJS module. Enabled with `-m` or `--module`.
    ///
    pub module: bool,

    /// Prefix the output with the JavaScript runtime. Enabled with
    /// `-b` or `--bundle`.
    ///
    pub bundle: bool,

    /// Debug logging. Enabled with `-v` or `--verbose`.
    ///
    pub verbose: bool,
}

// ------------------------------------------------------------- Public Functions

/// Parses the process arguments. Returns the unknown flags on
/// failure.
///
pub fn parse() -> Result<Args, Vec<String>> {
    parse_from(std::env::args_os().skip(1).collect())
}

pub fn parse_from(raw: Vec<OsString>) -> Result<Args, Vec<String>> {
    let mut pargs = pico_args::Arguments::from_vec(raw);

    let mut args = Args {
        module: pargs.contains(["-m", "--module"]),
        bundle: pargs.contains(["-b", "--bundle"]),
        verbose: pargs.contains(["-v", "--verbose"]),
        files: Vec::new(),
    };

    let (flags, files): (Vec<String>, Vec<String>) = pargs
        .finish()
        .into_iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .partition(|arg| arg.starts_with('-') && arg.len() > 1);

    if !flags.is_empty() {
        return Err(flags);
    }

    args.files = files;
    Ok(args)
}

/// Usage text printed when no files are given.
///
pub fn usage() -> &'static str {
    "Usage: yate file1.yat [...file2.yat] [options]
       yate file1.yat -m
Options:
  -m, --module     build as module
  -b, --bundle     prepend the yate runtime to the output
  -v, --verbose    log compilation steps"
}

// ------------------------------------------------------------- Unit Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_strs(args: &[&str]) -> Result<Args, Vec<String>> {
        parse_from(args.iter().map(OsString::from).collect())
    }

    #[test]
    fn test_parse_files_and_flags() {
        let args = parse_strs(&["a.yat", "-m", "b.yat", "--bundle"]).unwrap();
        assert_eq!(
            args,
            Args {
                files: vec!["a.yat".to_string(), "b.yat".to_string()],
                module: true,
                bundle: true,
                verbose: false,
            }
        );
    }

    #[test]
    fn test_parse_verbose_only() {
        let args = parse_strs(&["-v"]).unwrap();
        assert!(args.verbose);
        assert!(args.files.is_empty());
    }

    #[test]
    fn test_parse_unknown_flag() {
        assert_eq!(
            parse_strs(&["a.yat", "--watch"]),
            Err(vec!["--watch".to_string()])
        );
    }
}

// Log dispatch for the CLI.
//
// The planner library only talks to the `log` facade. Here a `fern`
// dispatcher routes records to stderr so that stdout carries nothing but
// the JSON summary. Warnings and errors are tagged with their level and
// target; info lines are printed bare; debug/trace lines carry a prefix.

use log::LevelFilter;

/// Verbosity picked on the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Warnings and errors only.
    Quiet,
    #[default]
    Normal,
    /// Per-step planner detail.
    Verbose,
}

impl Verbosity {
    pub fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::Warn,
            Verbosity::Normal => LevelFilter::Info,
            Verbosity::Verbose => LevelFilter::Debug,
        }
    }
}

pub fn init_logging(verbosity: Verbosity) -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .level(verbosity.level_filter())
        .format(|out, message, record| {
            let level = record.level();
            if level <= log::Level::Warn {
                out.finish(format_args!("[{}] {}: {}", level, record.target(), message))
            } else if level >= log::Level::Debug {
                out.finish(format_args!("[{}] {}", level, message))
            } else {
                out.finish(format_args!("{}", message))
            }
        })
        .chain(std::io::stderr())
        .apply()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(Verbosity::Quiet.level_filter(), LevelFilter::Warn);
        assert_eq!(Verbosity::default().level_filter(), LevelFilter::Info);
        assert_eq!(Verbosity::Verbose.level_filter(), LevelFilter::Debug);
    }
}

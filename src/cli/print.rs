use chunktail::record::{Level, Record};
use colored::{ColoredString, Colorize};

fn level_tag(level: Level) -> ColoredString {
    let tag = format!("{:<5}", level.as_str().to_uppercase());
    match level {
        Level::Crit => tag.red().bold(),
        Level::Error => tag.red(),
        Level::Warn => tag.yellow(),
        Level::Info => tag.green(),
        Level::Debug => tag.blue(),
        Level::Trace => tag.purple(),
        Level::Unknown => tag.dimmed(),
    }
}

/// One record as a single terminal line.
pub fn format_record(record: &Record) -> String {
    // Unparsed lines are shown verbatim.
    if record.level == Level::Unknown && record.timestamp.is_empty() && record.context.is_empty() {
        return record.message.clone();
    }

    let mut line = String::new();
    if !record.timestamp.is_empty() {
        line.push_str(&format!("{} ", record.timestamp.dimmed()));
    }
    line.push_str(&format!("{} {}", level_tag(record.level), record.message));
    for (key, value) in record.context_pairs() {
        line.push_str(&format!(" {}={}", key.cyan(), value));
    }
    line
}

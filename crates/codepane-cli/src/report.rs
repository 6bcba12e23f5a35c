//! Terminal rendering of the log panel.

use codepane::relay::{EntryCategory, LogEntry, LogPanel};

fn label(entry: &LogEntry) -> &'static str {
    match entry.category {
        EntryCategory::Console(method) => method.as_str(),
        EntryCategory::Fault => "fault",
    }
}

pub fn print_entry(entry: &LogEntry) {
    println!("   [{}] {}", label(entry), entry.text);
    if let Some(stack) = &entry.detail {
        for line in stack.lines() {
            println!("        {line}");
        }
    }
}

pub fn print_panel(panel: &LogPanel) {
    println!("\n Console ({} entries)", panel.len());
    for entry in panel.entries() {
        print_entry(entry);
    }
    let faults = panel.faults().count();
    if faults > 0 {
        println!("\n {faults} error(s)");
    }
}

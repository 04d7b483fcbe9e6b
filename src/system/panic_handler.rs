//! Panic hook
//!
//! Server mode prints a colored report with a backtrace; one-shot commands
//! print a single line. Both append a report to `crash.log` and emit a
//! `tracing::error!` so the panic reaches the configured log sink.

use std::fs::OpenOptions;
use std::io::Write;
use std::panic;

use chrono::Utc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Server,
    Command,
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

pub fn install_panic_hook(mode: RunMode) {
    panic::set_hook(Box::new(move |info| {
        let message = panic_message(info.payload());
        let location = info
            .location()
            .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_else(|| "Unknown location".to_string());
        let backtrace = std::backtrace::Backtrace::force_capture();

        tracing::error!(%location, "panic: {}", message);

        if let Err(e) = write_crash_log(&message, &location, &backtrace) {
            eprintln!("Failed to write crash log: {}", e);
        }

        match mode {
            RunMode::Server => {
                use colored::Colorize;
                eprintln!("{} {}", "PANIC".red().bold(), message.white());
                eprintln!("{} {}", "Location:".yellow().bold(), location);
                eprintln!("{}", format!("{:?}", backtrace).dimmed());
            }
            RunMode::Command => {
                eprintln!("Program panicked: {} (details in crash.log)", message);
            }
        }
    }));
}

fn write_crash_log(
    message: &str,
    location: &str,
    backtrace: &std::backtrace::Backtrace,
) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("crash.log")?;

    writeln!(
        file,
        "=== Crash Report {} ===",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(file, "Message: {}", message)?;
    writeln!(file, "Location: {}", location)?;
    writeln!(file, "{:?}\n", backtrace)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_extracts_str_and_string() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "Unknown panic");
    }
}

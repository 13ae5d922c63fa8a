use owo_colors::OwoColorize;
use crate::ui::{theme, Icons};

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn info(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon.style(theme().info.clone()), label.style(theme().dim.clone()), value);
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn phase(name: &str) {
    println!();
    println!("{} {}", Icons::GEAR.style(theme().info.clone()), name.style(theme().header.clone()));
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim.clone()), value);
}

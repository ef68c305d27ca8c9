//! Terminal rendering of screen state.

use serde::Serialize;
use sunshine_core::{DetailView, ListItem};

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_list(location: &str, city: Option<&str>, items: &[ListItem]) {
    match city {
        Some(city) if city != location => println!("{city} ({location})"),
        _ => println!("{location}"),
    }

    if items.is_empty() {
        println!("  No forecast stored yet. Try `sunshine refresh`.");
        return;
    }

    let day_width = items.iter().map(|i| i.day.chars().count()).max().unwrap_or(0);
    let desc_width = items
        .iter()
        .map(|i| i.description.chars().count())
        .max()
        .unwrap_or(0);

    for item in items {
        println!(
            "  {:<day_width$}  {}  {:<desc_width$}  {:>4} / {:>4}",
            item.day,
            item.icon.unwrap_or(" "),
            item.description,
            item.high,
            item.low,
        );
    }
}

pub fn print_detail(view: &DetailView) {
    println!("{}", view.day);
    println!("{} ({})", view.row.city_name, view.row.location_setting);
    println!();
    println!("  {} {}", view.icon.unwrap_or(" "), view.description);
    println!("  High {}  Low {}", view.high, view.low);
    println!("  {}", view.humidity);
    println!("  {}", view.wind);
    println!("  {}", view.pressure);
}

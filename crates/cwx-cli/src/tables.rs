//! Console table rendering for parsed records and session summaries.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use cwx_inbox::SessionSummary;
use cwx_model::{NotificationItem, Urgency};

fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn apply_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn urgency_cell(urgency: Urgency) -> Cell {
    let cell = Cell::new(urgency.as_str());
    match urgency {
        Urgency::High => cell.fg(Color::Red).add_attribute(Attribute::Bold),
        Urgency::Medium => cell.fg(Color::Yellow),
        Urgency::Low => cell.add_attribute(Attribute::Dim),
    }
}

fn flag_cell(value: bool) -> Cell {
    if value {
        Cell::new("yes").fg(Color::Green)
    } else {
        Cell::new("-").add_attribute(Attribute::Dim)
    }
}

pub fn print_items(items: &[NotificationItem]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Id"),
        header_cell("Urgency"),
        header_cell("Actionable"),
        header_cell("Patient"),
        header_cell("Location"),
        header_cell("Subject"),
        header_cell("Delivered"),
        header_cell("Sender"),
        header_cell("Type"),
        header_cell("Del"),
        header_cell("Extras"),
    ]);
    apply_style(&mut table);
    for item in items {
        let location = match item {
            NotificationItem::Delivered(n) => n.patient_location.as_deref().unwrap_or("-"),
            NotificationItem::Scheduled(_) => "-",
        };
        let extras = item
            .params()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(item.ident()),
            urgency_cell(item.urgency()),
            flag_cell(item.actionable()),
            Cell::new(item.patient_name().unwrap_or("-")),
            Cell::new(location),
            Cell::new(item.subject_line()),
            Cell::new(item.delivered_at().format("%Y-%m-%d %H:%M").to_string()),
            Cell::new(item.sender().unwrap_or("-")),
            Cell::new(item.alert_type().unwrap_or("-")),
            flag_cell(item.deletable()),
            Cell::new(if extras.is_empty() { "-".to_string() } else { extras }),
        ]);
    }
    println!("{table}");
    println!("{} record(s)", items.len());
}

pub fn print_summary(summary: &SessionSummary) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Outcome"), header_cell("Count")]);
    apply_style(&mut table);
    let count_rows = [
        ("Total", summary.total),
        ("Dispatched", summary.dispatched),
        ("Skipped", summary.skipped),
        ("Viewed", summary.viewed),
        ("Deleted", summary.deleted),
        ("Delete failures", summary.delete_failures),
    ];
    for (label, count) in count_rows {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(count).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{table}");
    if summary.canceled {
        println!("Session canceled before completion.");
    } else {
        println!("Session completed.");
    }
}

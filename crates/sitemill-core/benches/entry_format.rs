use sitemill_core::format::render_entry;
use sitemill_core::{Entry, RawRecord, Record};

const TS: &str = "2024-05-01T12:00:00.000Z";

fn records(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            let entry: Entry = if i % 2 == 0 {
                format!("https://www.example.com/articles/{i}?ref=feed&lang=en").into()
            } else {
                RawRecord {
                    url: Some(format!("https://www.example.com/products/{i}")),
                    change_freq: Some("weekly".to_string()),
                    priority: Some(0.8),
                }
                .into()
            };
            entry.normalize().unwrap()
        })
        .collect()
}

#[divan::bench(args = [false, true])]
fn render_entries(bencher: divan::Bencher, mobile: bool) {
    let records = records(10_000);
    bencher.bench(|| {
        let mut bytes = 0;
        for record in &records {
            bytes += render_entry(record, TS, mobile).len();
        }
        bytes
    });
}

#[divan::bench]
fn parse_lines(bencher: divan::Bencher) {
    let lines: Vec<String> = (0..10_000)
        .map(|i| format!(r#"{{"url": "/p/{i}", "changeFreq": "daily", "priority": 0.5}}"#))
        .collect();
    bencher.bench(|| {
        for line in &lines {
            let _ = Entry::parse_line(line).unwrap().normalize().unwrap();
        }
    });
}

fn main() {
    divan::main();
}

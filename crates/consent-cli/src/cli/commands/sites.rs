//! Prints the study configuration a participant will see.

use consent_core::config::{Config, SinkKind};

pub fn show(config: &Config) {
    println!("Sites ({}):", config.sites.len());
    for (i, site) in config.sites.iter().enumerate() {
        println!("  {:>2}. {site}", i + 1);
    }

    println!();
    println!("Options ({}):", config.options.len());
    let id_width = config
        .options
        .iter()
        .map(|o| o.id.len())
        .max()
        .unwrap_or_default();
    for option in &config.options {
        println!("  {:<id_width$}  {}", option.id, option.label);
    }

    println!();
    if config.browser.command.is_empty() {
        println!("Browser: system default (participant confirms closing)");
    } else {
        println!("Browser: {}", config.browser.command.join(" "));
    }

    match config.sink.kind {
        SinkKind::Firestore => println!(
            "Sink: firestore (collection {})",
            config.sink.collection
        ),
        SinkKind::Jsonl => println!("Sink: jsonl ({})", config.sink.records_path().display()),
        SinkKind::None => println!("Sink: none"),
    }
}

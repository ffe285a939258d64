use scanq_core::{load_clients, AppConfig};

/// Lists the client catalog with each client's sheets and whether its
/// spreadsheet URL resolves.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or fails validation.
pub(crate) fn run_clients(config: &AppConfig) -> anyhow::Result<()> {
    let catalog = load_clients(&config.clients_path)?;
    if catalog.clients.is_empty() {
        println!("no clients configured in {}", config.clients_path.display());
        return Ok(());
    }

    let defaults = config.rates();
    println!(
        "{:<20}{:<20}{:<10}{:<10}{:<24}SOURCE",
        "CLIENT", "SHEET", "KIND", "APPROVED", "PARTIAL"
    );
    for client in &catalog.clients {
        let rates = client.rates(defaults);
        let source = match client.spreadsheet_url(|key| std::env::var(key)) {
            Ok(_) => "configured".to_string(),
            Err(e) => format!("unavailable ({e})"),
        };
        for sheet in &client.sheets {
            println!(
                "{:<20}{:<20}{:<10}{:<10}{:<24}{}",
                client.slug(),
                sheet.slug(),
                sheet.kind.to_string(),
                rates.approved.to_string(),
                rates.partial.to_string(),
                source
            );
        }
    }
    Ok(())
}

//! Print readings from a QN/Etekcity scale
//!
//! Run with: cargo run --example scale_monitor -- <address> [kg|lb|st]

use qn_scale_ble::{Error, QnScale, Result, ScaleData, WeightUnit};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("qn_scale_ble=debug".parse().unwrap()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let address = args.next().ok_or_else(|| Error::InvalidParameter {
        name: "address".to_string(),
        value: String::new(),
    })?;
    let unit = args.next().map(|s| s.parse::<WeightUnit>()).transpose()?;

    println!("Listening for scale {}...", address);
    println!("Step on the scale. Press Ctrl+C to exit.\n");

    let scale = QnScale::new(address, print_reading);
    if let Some(unit) = unit {
        scale.set_display_unit(unit);
    }

    scale.async_start().await?;
    let _ = tokio::signal::ctrl_c().await;
    println!("\nExiting...");
    scale.async_stop().await?;

    Ok(())
}

fn print_reading(reading: ScaleData) {
    let Some(weight) = reading.weight_in_display_unit() else {
        return;
    };

    print!(
        "{} [{}] {:.2} {}",
        reading.timestamp.format("%H:%M:%S"),
        reading.name,
        weight,
        reading.display_unit
    );
    if let Some(impedance) = reading.impedance() {
        print!("  impedance {} ohm", impedance);
    }
    if let (Some(hw), Some(sw)) = (&reading.hw_version, &reading.sw_version) {
        print!("  (hw {}, fw {})", hw, sw);
    }
    println!();
}

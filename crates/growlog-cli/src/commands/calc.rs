use growlog_core::agronomy::{
    growing_degree_days, nutrient_lockout, vapor_pressure_deficit, LockoutCause,
};

use crate::cli::CalcCommands;
use crate::error::CliError;

pub fn run_calc(command: CalcCommands) -> Result<(), CliError> {
    match command {
        CalcCommands::Vpd {
            temp,
            humidity,
            leaf_offset,
        } => {
            let vpd = vapor_pressure_deficit(temp, humidity, leaf_offset)?;
            println!("{vpd:.2} kPa");
        }
        CalcCommands::Gdd { min, max, base } => {
            let gdd = growing_degree_days(min, max, base)?;
            println!("{gdd:.1} GDD (base {base} C)");
        }
        CalcCommands::Lockout { ph, json } => {
            let lockouts = nutrient_lockout(ph)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&lockouts)?);
            } else if lockouts.is_empty() {
                println!("No nutrients locked out at pH {ph}");
            } else {
                for lockout in lockouts {
                    let cause = match lockout.cause {
                        LockoutCause::TooAcidic => "too acidic",
                        LockoutCause::TooAlkaline => "too alkaline",
                    };
                    println!("{:<11} {cause}", lockout.nutrient.to_string());
                }
            }
        }
    }
    Ok(())
}

//! Display preference handlers.

use washbay_config::Settings;

use crate::cli::{GlobalOpts, SettingsArgs, SettingsCommand};
use crate::config;
use crate::error::CliError;
use crate::output;

fn detail(s: &Settings) -> String {
    output::detail_lines(&[
        ("theme", s.theme.to_string()),
        ("layout", s.layout.to_string()),
        ("density", s.density.to_string()),
    ])
}

fn plain(s: &Settings) -> String {
    format!("theme={}\nlayout={}\ndensity={}", s.theme, s.layout, s.density)
}

pub fn handle(args: SettingsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let provider = config::settings_provider()?;

    let settings = match args.command {
        SettingsCommand::Show => provider.get(),
        SettingsCommand::Set { key, value } => {
            let updated = provider.set_value(&key, &value)?;
            if !global.quiet {
                eprintln!("✓ Set {key} = {value}");
            }
            updated
        }
        SettingsCommand::Reset => {
            provider.set(Settings::default())?;
            if !global.quiet {
                eprintln!(
                    "✓ Settings reset ({})",
                    config::settings_path().display()
                );
            }
            Settings::default()
        }
    };

    let out = output::render_single(global.output(), &settings, detail, plain)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

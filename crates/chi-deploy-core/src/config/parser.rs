//! TOML parser with helpful error messages

use super::schema::DeployConfig;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse deploy.toml with detailed error messages
pub fn parse_deploy_toml(path: &Path) -> Result<DeployConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_deploy_toml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse deploy.toml content from string
pub fn parse_deploy_toml_str(content: &str) -> Result<DeployConfig> {
    let config: DeployConfig =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;

    config.validate()?;

    Ok(config)
}

/// Enhance TOML parsing errors with helpful context
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let error_msg = error.to_string();

    let line_hint = error.span().map(|span| {
        content[..span.start.min(content.len())]
            .bytes()
            .filter(|b| *b == b'\n')
            .count()
            + 1
    });

    if let Some(line_num) = line_hint {
        let context = get_line_context(content, line_num);
        anyhow::anyhow!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            context,
            error_msg
        )
    } else {
        anyhow::anyhow!("TOML parsing error: {}", error_msg)
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2).min(lines.len());
    let end = (line_num + 2).min(lines.len());

    lines[start..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialize a configuration to TOML string
pub fn to_toml(config: &DeployConfig) -> Result<String> {
    toml::to_string_pretty(config).with_context(|| "Failed to serialize configuration to TOML")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, TokenAmount};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = parse_deploy_toml_str("").unwrap();
        assert_eq!(config, DeployConfig::default());
    }

    #[test]
    fn test_parse_partial_sections() {
        let toml = r#"
[registry]
path = "state/registry.json"

[sale]
hard_cap = "150"
price = "20000"

[distribution]
treasury = "2500000.5"
revoke_deployer_minter = true
"#;

        let config = parse_deploy_toml_str(toml).unwrap();
        assert_eq!(config.registry.path, Path::new("state/registry.json"));
        assert_eq!(config.sale.hard_cap, TokenAmount::tokens(150));
        assert_eq!(config.sale.soft_cap, TokenAmount::tokens(80));
        assert_eq!(
            config.distribution.treasury,
            TokenAmount::parse("2500000.5").unwrap()
        );
        assert!(config.distribution.revoke_deployer_minter);
    }

    #[test]
    fn test_parse_external_addresses() {
        let toml = r#"
[external]
weth = "0x1111111111111111111111111111111111111111"
"#;

        let config = parse_deploy_toml_str(toml).unwrap();
        assert_eq!(
            config.external.weth,
            Address::parse("0x1111111111111111111111111111111111111111").unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_bad_address() {
        let toml = r#"
[external]
weth = "0x1234"
"#;

        assert!(parse_deploy_toml_str(toml).is_err());
    }

    #[test]
    fn test_parse_invalid_toml_reports_line() {
        let toml = "[sale\nhard_cap = \"1\"\n";
        let err = parse_deploy_toml_str(toml).unwrap_err().to_string();
        assert!(err.contains("TOML parsing error"));
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let toml = r#"
[sale]
soft_cap = "300"
"#;

        let err = parse_deploy_toml_str(toml).unwrap_err().to_string();
        assert!(err.contains("soft_cap"));
    }

    #[test]
    fn test_to_toml_roundtrip_keeps_large_deadline() {
        let original = DeployConfig::default();
        let toml_str = to_toml(&original).unwrap();
        let parsed = parse_deploy_toml_str(&toml_str).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_parse_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[oracles]
twap_update_period = 900
"#
        )
        .unwrap();

        let config = parse_deploy_toml(temp_file.path()).unwrap();
        assert_eq!(config.oracles.twap_update_period, 900);
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let result = parse_deploy_toml(Path::new("/nonexistent/path/deploy.toml"));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }
}

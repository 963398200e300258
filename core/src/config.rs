use crate::{
    batch::Scenario,
    fallback,
    state::MutualFundType,
    types::Money,
};
use serde::{Deserialize, Serialize};

/// Expected annual return band for one fund type, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnRange {
    pub annual_low_pct:  f64,
    pub annual_high_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundReturnConfig {
    pub equity: ReturnRange,
    pub debt:   ReturnRange,
    pub hybrid: ReturnRange,
}

impl FundReturnConfig {
    pub fn range_for(&self, fund_type: MutualFundType) -> ReturnRange {
        match fund_type {
            MutualFundType::Equity => self.equity,
            MutualFundType::Debt   => self.debt,
            MutualFundType::Hybrid => self.hybrid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomyConfig {
    pub starting_balance:         Money,
    pub default_risk_score:       i32,
    pub monthly_income:           Money,
    /// Flat deduction applied to gross income before crediting.
    pub income_tax_pct:           f64,
    pub scenarios_per_month:      usize,
    pub fund_returns:             FundReturnConfig,
    /// Charged on FD principal when a deposit is broken early.
    pub fd_break_penalty_pct:     f64,
}

#[derive(Debug, Clone, Deserialize)]
struct FallbackScenarioFile {
    scenarios:       Vec<Scenario>,
    reflection_tip:  String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub starting_balance:      Money,
    pub default_risk_score:    i32,
    pub monthly_income:        Money,
    pub income_tax_pct:        f64,
    pub scenarios_per_month:   usize,
    pub fund_returns:          FundReturnConfig,
    pub fd_break_penalty_pct:  f64,
    /// Pre-authored scenarios substituted for failed or malformed generation.
    pub fallback_scenarios:    Vec<Scenario>,
    /// Closing advice appended to fallback reflections.
    pub reflection_tip:        String,
}

impl GameConfig {
    /// Load from the data/ directory.
    /// In tests, use GameConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let economy_path = format!("{data_dir}/economy/economy_config.json");
        let economy_content = std::fs::read_to_string(&economy_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {economy_path}: {e}"))?;
        let economy: EconomyConfig = serde_json::from_str(&economy_content)?;

        let fallback_path = format!("{data_dir}/scenarios/fallback_scenarios.json");
        let fallback_content = std::fs::read_to_string(&fallback_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {fallback_path}: {e}"))?;
        let fallback_file: FallbackScenarioFile = serde_json::from_str(&fallback_content)?;

        let config = Self::from_parts(economy, fallback_file.scenarios, fallback_file.reflection_tip);
        config.validate()?;
        log::info!(
            "Loaded game config from {data_dir}: {} fallback scenarios",
            config.fallback_scenarios.len()
        );
        Ok(config)
    }

    /// Built-in configuration matching the shipped data files.
    pub fn default_test() -> Self {
        Self::from_parts(
            Self::default_economy(),
            fallback::builtin_scenarios(),
            fallback::BUILTIN_REFLECTION_TIP.to_string(),
        )
    }

    pub fn default_economy() -> EconomyConfig {
        EconomyConfig {
            starting_balance:     50_000,
            default_risk_score:   50,
            monthly_income:       30_000,
            income_tax_pct:       10.0,
            scenarios_per_month:  5,
            fund_returns: FundReturnConfig {
                equity: ReturnRange { annual_low_pct: 12.0, annual_high_pct: 15.0 },
                debt:   ReturnRange { annual_low_pct: 6.0,  annual_high_pct: 8.0 },
                hybrid: ReturnRange { annual_low_pct: 9.0,  annual_high_pct: 11.0 },
            },
            fd_break_penalty_pct: 1.0,
        }
    }

    fn from_parts(economy: EconomyConfig, fallback_scenarios: Vec<Scenario>, reflection_tip: String) -> Self {
        Self {
            starting_balance:     economy.starting_balance,
            default_risk_score:   economy.default_risk_score,
            monthly_income:       economy.monthly_income,
            income_tax_pct:       economy.income_tax_pct,
            scenarios_per_month:  economy.scenarios_per_month,
            fund_returns:         economy.fund_returns,
            fd_break_penalty_pct: economy.fd_break_penalty_pct,
            fallback_scenarios,
            reflection_tip,
        }
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scenarios_per_month == 0 {
            anyhow::bail!("scenarios_per_month must be at least 1");
        }
        if self.fallback_scenarios.len() < self.scenarios_per_month {
            anyhow::bail!(
                "fallback pool has {} scenarios, need at least {}",
                self.fallback_scenarios.len(),
                self.scenarios_per_month
            );
        }
        if let Some(bad) = self.fallback_scenarios.iter().find_map(|s| s.validate().err()) {
            anyhow::bail!("invalid fallback scenario: {bad}");
        }
        if !(0.0..100.0).contains(&self.income_tax_pct) {
            anyhow::bail!("income_tax_pct must be in [0, 100)");
        }
        if !(0.0..=100.0).contains(&self.fd_break_penalty_pct) {
            anyhow::bail!("fd_break_penalty_pct must be in [0, 100]");
        }
        if !(0..=100).contains(&self.default_risk_score) {
            anyhow::bail!("default_risk_score must be in [0, 100]");
        }
        if self.monthly_income < 0 {
            anyhow::bail!("monthly_income must not be negative");
        }
        for (name, range) in [
            ("equity", self.fund_returns.equity),
            ("debt", self.fund_returns.debt),
            ("hybrid", self.fund_returns.hybrid),
        ] {
            if range.annual_low_pct > range.annual_high_pct {
                anyhow::bail!("{name} return range is inverted");
            }
        }
        Ok(())
    }
}

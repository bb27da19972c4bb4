//! Configuration files for tools that no manifest declares.

use tracing::debug;

use konmari_core::{
    Category, ConfigFileRule, EngineError, Finding, PatternSet, PatternTables, ScoringConfig,
    Signal,
};

use crate::age::format_age;
use crate::classifier::{AnalysisContext, Classifier, ClassifierOutput};
use crate::scoring::ScoreCard;

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: ConfigFileRule,
    pattern: PatternSet,
}

/// Flags tool configuration left behind after the tool was removed.
#[derive(Debug, Clone)]
pub struct ConfigFileClassifier {
    rules: Vec<CompiledRule>,
    scoring: ScoringConfig,
}

impl ConfigFileClassifier {
    pub fn new(tables: &PatternTables, scoring: ScoringConfig) -> Result<Self, EngineError> {
        let rules = tables
            .config_files
            .iter()
            .map(|rule| {
                let label = format!("config_files.{}", rule.tool);
                Ok(CompiledRule {
                    pattern: PatternSet::compile(&label, std::slice::from_ref(&rule.file_pattern))?,
                    rule: rule.clone(),
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;
        Ok(Self { rules, scoring })
    }
}

impl Classifier for ConfigFileClassifier {
    fn category(&self) -> Category {
        Category::Configuration
    }

    fn classify(&self, ctx: &AnalysisContext<'_>) -> ClassifierOutput {
        let mut findings = Vec::new();
        let card = ScoreCard::new(self.scoring.config_base, &self.scoring.config_rules);

        for compiled in &self.rules {
            let rule = &compiled.rule;
            if ctx.manifests.has_failure(rule.ecosystem) {
                debug!(tool = %rule.tool, "manifest parse failure, rule not evaluated");
                continue;
            }
            if rule
                .packages
                .iter()
                .any(|p| ctx.manifests.declares(rule.ecosystem, p))
            {
                continue;
            }

            for record in ctx.snapshot.files.iter().filter(|f| compiled.pattern.is_match(&f.name)) {
                let age = record.age_days(ctx.now);
                if age < self.scoring.config_min_age_days {
                    continue;
                }

                let ecosystem_present = ctx.ecosystems.contains(rule.ecosystem);
                let mut signals = vec![Signal::ToolNotDeclared];
                if age > 90 {
                    signals.push(Signal::AgeOver90);
                }
                if !ecosystem_present {
                    signals.push(Signal::EcosystemAbsent);
                }

                let declared_in = if ecosystem_present {
                    format!("no {} manifest declares", rule.ecosystem)
                } else {
                    format!("no {} manifest exists to declare", rule.ecosystem)
                };
                findings.push(Finding::new(
                    record.display_path(),
                    Category::Configuration,
                    card.score(&signals),
                    signals,
                    format!(
                        "{} configuration but {declared_in} {}; last modified {} ago",
                        rule.tool,
                        rule.packages.join(" or "),
                        format_age(age)
                    ),
                ));
            }
        }

        ClassifierOutput::new(findings, ctx.snapshot.coverage_status())
    }
}

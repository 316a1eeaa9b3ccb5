//! Migration analyzer - classifies changes between the stored manifest and
//! the models about to be generated
//!
//! Analysis never takes the writer lock and never persists anything; the
//! caller decides what to do with the report and then records the new
//! baseline through [`ManifestStore::update_manifest`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::cancel::CallOptions;
use super::manifest_store::ManifestStore;
use crate::config::AnalysisConfig;
use crate::domain::{
    build_snapshots, diff_manifest, ChangeKind, ChangeRecord, Manifest, MigrationReport,
    ModelDefinition, ModelSnapshot, SeverityPolicy, TypeCompatibilityMatrix,
};
use crate::error::{GuardError, Result};
use crate::infrastructure::{FsBackend, ManifestBackend};
use crate::observability::{emit_event, AnalysisCompletedEvent, EventMetadata, GuardEvent, StepTimer};

/// Input to [`MigrationAnalyzer::analyze_migration_issues`]
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub microservice: String,
    pub models: Vec<ModelDefinition>,
    /// Generation target root
    pub target: PathBuf,
}

impl AnalysisRequest {
    pub fn new(
        microservice: impl Into<String>,
        models: Vec<ModelDefinition>,
        target: impl Into<PathBuf>,
    ) -> Self {
        Self {
            microservice: microservice.into(),
            models,
            target: target.into(),
        }
    }
}

/// Additional checks run after the built-in diff.
///
/// Extensions are handed to the analyzer explicitly. Every record they
/// return lands in `extensionFindings` and counts toward the report flags.
pub trait AnalyzerExtension: Send + Sync {
    fn name(&self) -> &str;

    fn inspect(
        &self,
        prior: &Manifest,
        current: &BTreeMap<String, ModelSnapshot>,
    ) -> Vec<ChangeRecord>;
}

pub struct MigrationAnalyzer<'a, B: ManifestBackend = FsBackend> {
    store: &'a ManifestStore<B>,
    matrix: TypeCompatibilityMatrix,
    policy: SeverityPolicy,
    extensions: Vec<Arc<dyn AnalyzerExtension>>,
}

impl<'a, B: ManifestBackend> MigrationAnalyzer<'a, B> {
    /// Analyzer with the built-in compatibility table and default policy
    pub fn new(store: &'a ManifestStore<B>) -> Self {
        Self {
            store,
            matrix: TypeCompatibilityMatrix::new(),
            policy: SeverityPolicy::default(),
            extensions: Vec::new(),
        }
    }

    pub fn from_config(store: &'a ManifestStore<B>, config: &AnalysisConfig) -> Self {
        Self::new(store)
            .with_matrix(config.compatibility_matrix())
            .with_policy(config.severity_policy())
    }

    pub fn with_matrix(mut self, matrix: TypeCompatibilityMatrix) -> Self {
        self.matrix = matrix;
        self
    }

    pub fn with_policy(mut self, policy: SeverityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_extension(mut self, extension: Arc<dyn AnalyzerExtension>) -> Self {
        self.extensions.push(extension);
        self
    }

    pub async fn analyze_migration_issues(&self, request: &AnalysisRequest) -> Result<MigrationReport> {
        self.analyze_migration_issues_with(request, &self.store.default_options())
            .await
    }

    /// Same as [`Self::analyze_migration_issues`] with explicit cancellation
    /// and timeout for the manifest load
    pub async fn analyze_migration_issues_with(
        &self,
        request: &AnalysisRequest,
        options: &CallOptions,
    ) -> Result<MigrationReport> {
        let timer = StepTimer::start();
        let microservice = request.microservice.trim();
        if microservice.is_empty() {
            return Err(GuardError::invalid("microservice name is empty"));
        }
        let current = build_snapshots(&request.models)?;

        let location = self.store.location(&request.target);
        let report = match self.store.load_manifest_with(&request.target, options).await? {
            None => {
                info!(
                    root = %location.target,
                    microservice = %microservice,
                    "No manifest found, treating as first generation"
                );
                MigrationReport::first_generation()
            }
            Some(prior) => {
                if prior.microservice_name != microservice {
                    warn!(
                        root = %location.target,
                        stored = %prior.microservice_name,
                        supplied = %microservice,
                        "Manifest belongs to a different microservice name"
                    );
                }

                let mut issues = diff_manifest(&prior, &current, &self.matrix, self.policy);
                for extension in &self.extensions {
                    let findings = extension.inspect(&prior, &current);
                    debug!(
                        extension = extension.name(),
                        findings = findings.len(),
                        "Extension finished"
                    );
                    issues
                        .extension_findings
                        .extend(findings.into_iter().map(|mut record| {
                            record.kind = ChangeKind::Extension;
                            record
                        }));
                }
                MigrationReport::from_issues(issues)
            }
        };

        let summary = &report.summary;
        info!(
            root = %location.target,
            first_generation = report.is_first_generation,
            total = summary.total,
            fixable = summary.fixable_count,
            warnings = summary.warning_count,
            destructive = summary.destructive_count,
            dangerous = summary.danger_count,
            "Migration analysis complete"
        );
        emit_event(GuardEvent::AnalysisCompleted(AnalysisCompletedEvent::from_report(
            EventMetadata::new(&location.target, microservice),
            &report,
            timer.elapsed_secs(),
        )));

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ManifestConfig;
    use crate::domain::{DataType, FieldDefinition, Severity, TypeChangeOverride, TypeChangeSeverity, MADE_OPTIONAL};
    use crate::error::ErrorKind;
    use crate::infrastructure::MemoryBackend;
    use crate::services::manifest_store::ManifestUpdate;
    use std::path::Path;

    const TARGET: &str = "services/hr";

    fn store() -> ManifestStore<MemoryBackend> {
        ManifestStore::with_backend(MemoryBackend::new(), ManifestConfig::default())
    }

    fn employee_v1() -> ModelDefinition {
        ModelDefinition::new("Employee")
            .with_field(FieldDefinition::required("id", "Int"))
            .with_field(FieldDefinition::required("firstName", "String"))
            .with_field(FieldDefinition::optional("middleName", "String"))
            .with_field(FieldDefinition::required("salary", "Decimal"))
    }

    fn department() -> ModelDefinition {
        ModelDefinition::new("Department")
            .with_field(FieldDefinition::required("id", "Int"))
            .with_field(FieldDefinition::required("name", "String"))
    }

    async fn baseline(store: &ManifestStore<MemoryBackend>, models: Vec<ModelDefinition>) {
        store
            .update_manifest(ManifestUpdate::new(TARGET, "hr", models))
            .await
            .unwrap();
    }

    async fn analyze(
        store: &ManifestStore<MemoryBackend>,
        models: Vec<ModelDefinition>,
    ) -> MigrationReport {
        MigrationAnalyzer::new(store)
            .analyze_migration_issues(&AnalysisRequest::new("hr", models, TARGET))
            .await
            .unwrap()
    }

    fn with_field_replaced(model: ModelDefinition, field: FieldDefinition) -> ModelDefinition {
        let mut model = model;
        model.fields.retain(|f| f.name != field.name);
        model.fields.push(field);
        model
    }

    #[tokio::test]
    async fn test_first_generation_short_circuit() {
        let store = store();
        let report = analyze(&store, vec![employee_v1()]).await;

        assert!(report.is_first_generation);
        assert!(!report.has_issues);
        assert!(report.issues.is_empty());
        // Analysis never persists
        assert!(store.load_manifest(Path::new(TARGET)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unchanged_models_have_no_issues() {
        let store = store();
        baseline(&store, vec![employee_v1(), department()]).await;

        let report = analyze(&store, vec![department(), employee_v1()]).await;
        assert!(!report.is_first_generation);
        assert!(!report.has_issues);
        assert_eq!(report.summary.total, 0);
    }

    #[tokio::test]
    async fn test_new_required_field_is_fixable_not_dangerous() {
        let store = store();
        baseline(&store, vec![employee_v1()]).await;

        let employee = employee_v1().with_field(FieldDefinition::required("lastName", "String"));
        let report = analyze(&store, vec![employee]).await;

        assert!(report.has_fixable_changes);
        assert!(!report.has_dangerous_changes);
        assert!(report.has_non_safe_issues);
        let record = &report.issues.required_field_on_existing_model[0];
        assert_eq!(record.model, "Employee");
        assert_eq!(record.field.as_deref(), Some("lastName"));
        assert_eq!(record.severity, Severity::Fixable);
        assert_eq!(record.suggested_fix.as_deref(), Some(MADE_OPTIONAL));
    }

    #[tokio::test]
    async fn test_new_optional_field_is_silent() {
        let store = store();
        baseline(&store, vec![employee_v1()]).await;

        let employee = employee_v1().with_field(FieldDefinition::optional("nickname", "String"));
        let report = analyze(&store, vec![employee]).await;
        assert!(!report.has_issues);
    }

    #[tokio::test]
    async fn test_removals_are_informational() {
        let store = store();
        baseline(&store, vec![employee_v1(), department()]).await;

        let mut employee = employee_v1();
        employee.fields.retain(|f| f.name != "firstName");
        let report = analyze(&store, vec![employee]).await;

        assert_eq!(report.issues.field_removals.len(), 1);
        assert_eq!(report.issues.field_removals[0].field.as_deref(), Some("firstName"));
        assert_eq!(report.issues.model_removals.len(), 1);
        assert_eq!(report.issues.model_removals[0].model, "Department");
        assert_eq!(report.summary.info_count, 2);
        assert!(report.has_issues);
        assert!(!report.has_non_safe_issues);
        assert!(!report.has_dangerous_changes);
    }

    #[tokio::test]
    async fn test_single_model_removal_counts_one_info() {
        let store = store();
        baseline(&store, vec![employee_v1(), department()]).await;

        let report = analyze(&store, vec![employee_v1()]).await;
        assert_eq!(report.summary.info_count, 1);
        assert!(!report.has_non_safe_issues);
    }

    #[tokio::test]
    async fn test_new_model_is_safe() {
        let store = store();
        baseline(&store, vec![employee_v1()]).await;

        let report = analyze(&store, vec![employee_v1(), department()]).await;
        assert_eq!(report.issues.safe_changes.len(), 1);
        assert_eq!(report.issues.safe_changes[0].model, "Department");
        assert_eq!(report.summary.safe_count, 1);
        assert!(report.has_issues);
        assert!(!report.has_non_safe_issues);
    }

    #[tokio::test]
    async fn test_decimal_to_float_is_warning() {
        let store = store();
        baseline(&store, vec![employee_v1()]).await;

        let employee = with_field_replaced(employee_v1(), FieldDefinition::required("salary", "Float"));
        let report = analyze(&store, vec![employee]).await;

        assert_eq!(report.issues.type_change_warnings.len(), 1);
        assert!(report.issues.destructive_type_changes.is_empty());
        assert_eq!(report.summary.warning_count, 1);
        assert!(report.has_non_safe_issues);
        assert!(!report.has_dangerous_changes);
    }

    #[tokio::test]
    async fn test_decimal_to_string_is_destructive() {
        let store = store();
        baseline(&store, vec![employee_v1()]).await;

        let employee = with_field_replaced(employee_v1(), FieldDefinition::required("salary", "String"));
        let report = analyze(&store, vec![employee]).await;

        let record = &report.issues.destructive_type_changes[0];
        assert_eq!(record.field.as_deref(), Some("salary"));
        assert_eq!(record.severity, Severity::Destructive);
        assert!(report.issues.type_change_warnings.is_empty());
        assert!(report.has_non_safe_issues);
        assert!(!report.has_dangerous_changes);
    }

    #[tokio::test]
    async fn test_blocking_policy_makes_destructive_dangerous() {
        let store = store();
        baseline(&store, vec![employee_v1()]).await;

        let config = AnalysisConfig {
            destructive_type_changes_block: true,
            ..AnalysisConfig::default()
        };
        let employee = with_field_replaced(employee_v1(), FieldDefinition::required("salary", "String"));
        let report = MigrationAnalyzer::from_config(&store, &config)
            .analyze_migration_issues(&AnalysisRequest::new("hr", vec![employee], TARGET))
            .await
            .unwrap();

        assert!(report.has_dangerous_changes);
        assert!(report.blocks_deployment());
    }

    #[tokio::test]
    async fn test_type_override_downgrades_change() {
        let store = store();
        baseline(&store, vec![employee_v1()]).await;

        let config = AnalysisConfig {
            type_overrides: vec![TypeChangeOverride {
                from: DataType::Decimal,
                to: DataType::String,
                severity: TypeChangeSeverity::Warning,
            }],
            ..AnalysisConfig::default()
        };
        let employee = with_field_replaced(employee_v1(), FieldDefinition::required("salary", "String"));
        let report = MigrationAnalyzer::from_config(&store, &config)
            .analyze_migration_issues(&AnalysisRequest::new("hr", vec![employee], TARGET))
            .await
            .unwrap();

        assert_eq!(report.issues.type_change_warnings.len(), 1);
        assert!(report.issues.destructive_type_changes.is_empty());
    }

    #[tokio::test]
    async fn test_optional_to_required_is_dangerous() {
        let store = store();
        baseline(&store, vec![employee_v1()]).await;

        let employee =
            with_field_replaced(employee_v1(), FieldDefinition::required("middleName", "String"));
        let report = analyze(&store, vec![employee]).await;

        let record = &report.issues.optional_to_required[0];
        assert_eq!(record.field.as_deref(), Some("middleName"));
        assert_eq!(record.severity, Severity::Dangerous);
        assert!(report.has_dangerous_changes);
        assert!(report.blocks_deployment());
        assert_eq!(report.summary.danger_count, 1);
    }

    #[tokio::test]
    async fn test_invalid_input_aborts_before_loading() {
        let store = store();
        let broken = ModelDefinition::new("Employee").with_field(FieldDefinition::required("", "Int"));

        let err = MigrationAnalyzer::new(&store)
            .analyze_migration_issues(&AnalysisRequest::new("hr", vec![broken], TARGET))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = MigrationAnalyzer::new(&store)
            .analyze_migration_issues(&AnalysisRequest::new(" ", vec![employee_v1()], TARGET))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_corrupt_manifest_propagates() {
        let store = store();
        let path = store.location(Path::new(TARGET)).path;
        store.backend().insert_raw(path, "not json");

        let err = MigrationAnalyzer::new(&store)
            .analyze_migration_issues(&AnalysisRequest::new("hr", vec![employee_v1()], TARGET))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptManifest);
    }

    struct TableNameLength;

    impl AnalyzerExtension for TableNameLength {
        fn name(&self) -> &str {
            "table-name-length"
        }

        fn inspect(
            &self,
            _prior: &Manifest,
            current: &BTreeMap<String, ModelSnapshot>,
        ) -> Vec<ChangeRecord> {
            current
                .keys()
                .filter(|name| name.len() > 8)
                .map(|name| {
                    ChangeRecord::model(
                        ChangeKind::ModelAdded,
                        name,
                        Severity::Warning,
                        format!("{} exceeds 8 characters", name),
                    )
                })
                .collect()
        }
    }

    #[tokio::test]
    async fn test_extension_findings_feed_flags() {
        let store = store();
        baseline(&store, vec![employee_v1()]).await;

        let report = MigrationAnalyzer::new(&store)
            .with_extension(Arc::new(TableNameLength))
            .analyze_migration_issues(&AnalysisRequest::new("hr", vec![employee_v1()], TARGET))
            .await
            .unwrap();

        assert_eq!(report.issues.extension_findings.len(), 0);

        let report = MigrationAnalyzer::new(&store)
            .with_extension(Arc::new(TableNameLength))
            .analyze_migration_issues(&AnalysisRequest::new(
                "hr",
                vec![employee_v1(), department()],
                TARGET,
            ))
            .await
            .unwrap();

        let finding = &report.issues.extension_findings[0];
        assert_eq!(finding.model, "Department");
        assert_eq!(finding.kind, ChangeKind::Extension);
        assert_eq!(report.summary.warning_count, 1);
        assert!(report.has_non_safe_issues);
    }
}

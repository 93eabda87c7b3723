//! Credit application intake migration, client evaluation, and status control.
//!
//! An intake captured by the public web form is fanned out by the
//! [`MigrationPipeline`] into one application, two persons, their personal data
//! and documents, references, financial terms, and the vehicle snapshot.

pub mod builders;
pub mod domain;
pub mod evaluation;
pub mod gateway;
pub mod intake;
pub mod memory;
pub mod pipeline;
pub mod router;
pub mod service;
pub mod status;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationStatus, Collection, Document, DocumentHistoryEntry, DocumentKind,
    DocumentReviewStatus, FinancialTerms, IdentityDocumentType, IntakeFinancing, IntakePerson,
    IntakeReference, IntakeSubmission, IntakeVehicle, Person, PersonRole, PersonalData, Priority,
    RecordId, Reference, Stored, Vehicle,
};
pub use evaluation::{
    BureauCheck, BureauResult, ClientEvaluation, DocumentaryReview, EvaluationConfig,
    EvaluationEngine, EvaluationError, EvaluationOutcome, EvaluationService, IncomeReview,
    Recommendation, RiskLevel, ScoreComponent, ScoreFactor,
};
pub use gateway::{DocumentFields, DocumentStore, PersistenceGateway, StoreError};
pub use intake::{IntakeRecord, IntakeRepository};
pub use memory::MemoryDocumentStore;
pub use pipeline::{
    CreatedRecord, MigrationError, MigrationFailure, MigrationPipeline, MigrationReport,
    MigrationStep, RollbackOutcome,
};
pub use router::credit_router;
pub use service::{ApplicationView, CreditApplicationService, CreditServiceError, PersonView};
pub use status::InvalidTransition;

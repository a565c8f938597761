// vigil-core/src/lib.rs

// 1. Documentation
#![allow(missing_docs)] // On autorise le manque de doc pour le moment

// 2. Memory safety
#![deny(unsafe_code)]
// 3. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 4. Performance
#![warn(clippy::perf)]

// --- MODULES HEXAGONAUX ---

// 1. Ports (Interfaces / Traits)
// Contrats vers l'extérieur : Datasource, BaselineStore.
pub mod ports;

// 2. Domain (Cœur du métier)
// Statuts, seuils, évaluation, baselines, TableSpec.
// Ne dépend de RIEN d'autre (ni infra, ni app).
pub mod domain;

// 3. Infrastructure (Adapters)
// DuckDB, fichiers de baseline JSON, chargement de vigil.yaml.
// Dépend du Domain et des Ports.
pub mod infrastructure;

// 4. Application (Use Cases)
// Exécution des checks : requêtes, runner par table, orchestration du run.
// Dépend du Domain et des Ports.
pub mod application;

// --- GESTION DES ERREURS GLOBALE ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
// Permet d'importer l'erreur principale facilement : use vigil_core::VigilError;
pub use error::VigilError;

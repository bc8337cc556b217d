// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Kubecompose
//!
//! A deterministic translator from Compose applications to Kubernetes manifests.
//!
//! ## Overview
//!
//! Kubecompose reads a Compose project, resolves the per-service deployment
//! configuration carried in `x-k8s` extension blocks, and synthesizes the
//! Kubernetes objects that run it:
//!
//! - Deployments, StatefulSets, DaemonSets and Jobs
//! - Services, Ingresses and NetworkPolicies
//! - ConfigMaps, Secrets and PersistentVolumeClaims
//! - HorizontalPodAutoscalers and ServiceAccounts
//!
//! The same input always yields the same output, byte for byte.
//!
//! ## Architecture
//!
//! 1. **Parse**: [`compose::ComposeParser`] loads the project
//! 2. **Resolve**: [`config::ConfigResolver`] merges overrides, inferred
//!    values and defaults into a validated configuration per service
//! 3. **Synthesize**: [`transform::Transformer`] builds the objects
//!
//! ## Modules
//!
//! - [`compose`]: Compose project model and parser
//! - [`config`]: `x-k8s` override decoding, merging and validation
//! - [`volumes`]: Volume resolution and inheritance
//! - [`transform`]: Object synthesis
//! - [`k8s`]: Typed Kubernetes objects
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! services:
//!   web:
//!     image: nginx
//!     ports: ["8080:80"]
//!     x-k8s:
//!       service:
//!         type: NodePort
//!         nodeport: 30080
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod compose;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod k8s;
pub mod project;
pub mod transform;
pub mod units;
pub mod volumes;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use compose::{ComposeParser, Project, ServiceConfig};
pub use config::{ConfigResolver, ConfigValidator, K8sOverride, ResolvedServiceConfig};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{KubeComposeError, Result};
pub use k8s::KubernetesObject;
pub use project::ProjectService;
pub use transform::{TransformOptions, TransformOutput, Transformer};
pub use volumes::{VolumeBinding, VolumeResolver};

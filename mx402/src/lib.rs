#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! x402 exact payments on MultiversX.
//!
//! This crate implements the payment side of HTTP 402 flows on the
//! MultiversX network: encoding a payment into a deterministic transaction,
//! signing and checking Ed25519 signatures, relaying signed transactions
//! under a per-sender quota, and verifying payments by simulation.
//!
//! # Overview
//!
//! A merchant answers a request with [`proto::PaymentRequirements`]. The payer
//! builds a transaction with [`exact::encode`] (or [`exact::client::ExactClient`]),
//! signs it and sends the resulting [`proto::ExactPayload`]. A facilitator
//! then either checks the payload with [`verify::VerificationService`] or
//! broadcasts it with [`relay::RelayService`].
//!
//! # Modules
//!
//! - [`amount`] - Atomic token amounts
//! - [`chain`] - Bech32 addresses and CAIP-2 chain ids
//! - [`exact`] - The exact scheme: transfer encoding and decoding, client
//! - [`gateway`] - Network gateway abstraction and its HTTP implementation
//! - [`networks`] - Registry of well-known MultiversX networks
//! - [`proto`] - Wire format types
//! - [`quota`] - Per-sender relay quota
//! - [`relay`] - Signature-checked, rate-limited broadcast
//! - [`signature`] - Signable bytes and Ed25519 validation
//! - [`signer`] - Signing abstraction and a local key signer
//! - [`verify`] - Requirement matching and simulation-based verification
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation for debugging and monitoring

pub mod amount;
pub mod chain;
pub mod exact;
pub mod gateway;
pub mod networks;
pub mod proto;
pub mod quota;
pub mod relay;
pub mod signature;
pub mod signer;
pub mod verify;

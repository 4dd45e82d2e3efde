// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery of structured log records to CloudWatch Logs.
//!
//! The remote service only accepts an append to a log stream when it carries
//! the sequence token returned by the previous append. This crate keeps that
//! token in a [`registry::SequenceRegistry`], mirrors it to disk through the
//! [`token_store::TokenStore`] so a restarted process resumes where it left
//! off, and makes sure the destination exists before the first append via
//! the [`provisioner::StreamProvisioner`].
//!
//! ```text
//!   RawOptions ──> DeliveryConfig ──> StreamProvisioner ──┐
//!                                                          v
//!   DecodedRecord ──> serialize ──> DeliveryEngine <──> SequenceRegistry
//!                                        │                 │
//!                                        v                 v
//!                                     LogsApi          TokenStore
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod client;
pub mod config;
pub mod credentials;
pub mod delivery;
pub mod error;
pub mod flusher;
pub mod provisioner;
pub mod record;
pub mod registry;
pub mod token_store;

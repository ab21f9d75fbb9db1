//! Server orchestration.
//!
//! The server owns the database, runs the one-time preprocessing (public
//! matrix seed, shard hints, LinPIR diagonal database) and answers both
//! phases. After [`Server::preprocess`] completes the state is read-only,
//! so request handlers take `&self` and are safe to call from concurrent
//! client sessions.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::database::{Database, HintMatrix};
use crate::error::{Error, Result};
use crate::linpir::{LinPirContext, LinPirDatabase};
use crate::lwe;
use crate::messages::{PrepareRequest, PrepareResponse, Request, Response};
use crate::params::Parameters;

/// Public material published after preprocessing: the seed of the public
/// random matrix A. Clients expand A themselves with the configured PRNG.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicParams {
    /// 32-byte seed of A.
    pub seed_a: [u8; 32],
}

struct Preprocessed {
    public_params: PublicParams,
    hints: Vec<HintMatrix>,
    linpir_ctx: LinPirContext,
    linpir_db: LinPirDatabase,
}

/// PIR server: database plus (after preprocessing) the published public
/// parameters and the evaluation-ready hint material.
pub struct Server {
    params: Parameters,
    database: Database,
    state: Option<Preprocessed>,
}

impl Server {
    /// Create a server over explicit records.
    pub fn create(params: &Parameters, records: &[Vec<u8>]) -> Result<Self> {
        let database = Database::create(params, records)?;
        Ok(Self {
            params: params.clone(),
            database,
            state: None,
        })
    }

    /// Create a server with pseudorandom database records.
    pub fn create_with_random_database_records(params: &Parameters) -> Result<Self> {
        let database = Database::create_with_random_records(params)?;
        Ok(Self {
            params: params.clone(),
            database,
            state: None,
        })
    }

    /// Create a server with pseudorandom records from a fixed seed, so two
    /// deployments (or a test and its expectation) agree on the contents.
    pub fn create_with_seeded_random_database_records(
        params: &Parameters,
        seed: [u8; 32],
    ) -> Result<Self> {
        let database = Database::with_seeded_random_records(params, seed)?;
        Ok(Self {
            params: params.clone(),
            database,
            state: None,
        })
    }

    /// Run the one-time preprocessing with a fresh random seed for A.
    pub fn preprocess(&mut self) -> Result<()> {
        let seed = lwe::random_seed(&mut rand::thread_rng());
        self.preprocess_with_seed(seed)
    }

    /// Run the one-time preprocessing with a caller-chosen seed for A
    /// (reproducible/verifiable deployments).
    ///
    /// Completes atomically: request handlers see either no preprocessed
    /// state or all of it. Fails if called twice.
    pub fn preprocess_with_seed(&mut self, seed: [u8; 32]) -> Result<()> {
        if self.state.is_some() {
            return Err(Error::InvalidParameters(
                "preprocess may only run once".into(),
            ));
        }

        info!(
            rows = self.params.db_rows,
            cols = self.params.db_cols,
            shards = self.params.num_shards(),
            "preprocessing database"
        );

        let matrix_a = lwe::expand_matrix(
            seed,
            self.params.prng_type,
            self.params.db_cols,
            self.params.lwe_secret_dim,
            self.params.lwe_mask(),
        );
        let hints = self.database.compute_hints(&matrix_a);

        let linpir_ctx = LinPirContext::new(&self.params);
        let linpir_db = LinPirDatabase::build(&linpir_ctx, &hints);

        info!(hints = hints.len(), "preprocessing complete");
        self.state = Some(Preprocessed {
            public_params: PublicParams { seed_a: seed },
            hints,
            linpir_ctx,
            linpir_db,
        });
        Ok(())
    }

    fn preprocessed(&self) -> Result<&Preprocessed> {
        self.state.as_ref().ok_or(Error::NotPreprocessed)
    }

    /// Published public parameters.
    pub fn public_params(&self) -> Result<&PublicParams> {
        Ok(&self.preprocessed()?.public_params)
    }

    /// Read-only database access.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// The per-shard hint matrices (for state-size accounting).
    pub fn hints(&self) -> Result<&[HintMatrix]> {
        Ok(&self.preprocessed()?.hints)
    }

    /// Prepare phase: evaluate `H·s` homomorphically against the client's
    /// encrypted secret.
    pub fn handle_prepare_request(&self, request: &PrepareRequest) -> Result<PrepareResponse> {
        let state = self.preprocessed()?;
        debug!(branches = request.branches.len(), "handling prepare request");
        state.linpir_db.evaluate(&state.linpir_ctx, request)
    }

    /// Online phase, direct path: compute `D·u` and service the embedded
    /// LinPIR request when present.
    pub fn handle_request(&self, request: &Request) -> Result<Response> {
        self.answer(request, true)
    }

    /// Online phase, prepare-optimized path: the identical `D·u`
    /// computation, with nothing LinPIR-related to redo.
    pub fn handle_request_skip_lin_pir(&self, request: &Request) -> Result<Response> {
        self.answer(request, false)
    }

    /// Shared request handling, parameterized by recovery mode.
    fn answer(&self, request: &Request, service_linpir: bool) -> Result<Response> {
        self.preprocessed()?;
        debug!(
            cols = request.query.len(),
            service_linpir, "handling online request"
        );

        let du = self.database.multiply(&request.query)?;
        let linpir = match (&request.linpir, service_linpir) {
            (Some(prepare), true) => Some(self.handle_prepare_request(prepare)?),
            _ => None,
        };

        Ok(Response { du, linpir })
    }
}

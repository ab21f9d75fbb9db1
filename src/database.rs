//! Database encoding, shard hints, and the online matrix-vector product.
//!
//! Records pack into a `db_rows x db_cols` matrix of
//! `lwe_plaintext_bit_size`-bit cells, ordered column-major so every record
//! lives inside a single column. The database is built once, preprocessed
//! once (hint computation), then served read-only.

use rand::RngCore;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::params::Parameters;

/// One shard's hint matrix `H = D_sh · A` over the LWE modulus,
/// `rows_per_block x lwe_secret_dim`, row-major.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HintMatrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<u64>,
}

impl HintMatrix {
    /// Entry at (r, c).
    #[inline]
    pub fn at(&self, r: usize, c: usize) -> u64 {
        self.data[r * self.cols + c]
    }
}

/// The encoded database. Owned by the server; read-only once built.
#[derive(Clone, Debug)]
pub struct Database {
    params: Parameters,
    /// Cells, column-major: `cells[col * db_rows + row]`.
    cells: Vec<u64>,
}

impl Database {
    /// Pack records into the cell matrix.
    ///
    /// Fails with `Error::Encoding` if a record is malformed (wrong byte
    /// length, or bits set beyond `db_record_bit_size`) or if more records
    /// are supplied than fit. Missing trailing records encode as zero.
    pub fn create(params: &Parameters, records: &[Vec<u8>]) -> Result<Self> {
        params.validate()?;

        let num_records = params.num_records();
        if records.len() > num_records {
            return Err(Error::Encoding(format!(
                "{} records exceed capacity {}",
                records.len(),
                num_records
            )));
        }

        let record_bits = params.db_record_bit_size;
        let record_bytes = record_bits.div_ceil(8);
        let mut cells = vec![0u64; params.db_rows * params.db_cols];

        for (i, record) in records.iter().enumerate() {
            if record.len() != record_bytes {
                return Err(Error::Encoding(format!(
                    "record {} has {} bytes, expected {}",
                    i,
                    record.len(),
                    record_bytes
                )));
            }
            // Trailing bits beyond the declared width must be clear.
            if record_bits % 8 != 0 {
                let spare = record[record_bytes - 1] >> (record_bits % 8);
                if spare != 0 {
                    return Err(Error::Encoding(format!(
                        "record {} exceeds {} bits",
                        i, record_bits
                    )));
                }
            }

            let loc = params.record_location(i)?;
            let cell_bits = params.lwe_plaintext_bit_size;
            let base = loc.col * params.db_rows + loc.row;
            for bit in 0..record_bits {
                if (record[bit / 8] >> (bit % 8)) & 1 == 1 {
                    cells[base + bit / cell_bits] |= 1u64 << (bit % cell_bits);
                }
            }
        }

        Ok(Self {
            params: params.clone(),
            cells,
        })
    }

    /// Fill every record with pseudorandom content from the given seed.
    pub fn with_seeded_random_records(params: &Parameters, seed: [u8; 32]) -> Result<Self> {
        params.validate()?;

        let mut stream = params.prng_type.stream(seed);
        let record_bits = params.db_record_bit_size;
        let cell_bits = params.lwe_plaintext_bit_size;
        // Cells carry record payload bits only; sub-cell records leave the
        // top cell bits clear.
        let payload_bits = record_bits.min(cell_bits);
        let payload_mask = (1u64 << payload_bits) - 1;

        let cells = (0..params.db_rows * params.db_cols)
            .map(|_| stream.next_u64() & payload_mask)
            .collect();

        Ok(Self {
            params: params.clone(),
            cells,
        })
    }

    /// Fill every record with random content from fresh entropy.
    pub fn create_with_random_records(params: &Parameters) -> Result<Self> {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::with_seeded_random_records(params, seed)
    }

    /// The protocol parameters this database was built for.
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Number of independent row-block shards.
    pub fn num_shards(&self) -> usize {
        self.params.num_shards()
    }

    /// Number of logical records.
    pub fn num_records(&self) -> usize {
        self.params.num_records()
    }

    /// Cell at (row, col).
    #[inline]
    pub fn cell(&self, row: usize, col: usize) -> u64 {
        self.cells[col * self.params.db_rows + row]
    }

    /// Compute one hint per shard: `H_sh = D_sh · A` over the LWE modulus.
    ///
    /// `matrix_a` is `db_cols x lwe_secret_dim`, row-major. The row
    /// products run as a parallel map; the shard order of the result is
    /// deterministic.
    pub fn compute_hints(&self, matrix_a: &[u64]) -> Vec<HintMatrix> {
        let rows = self.params.db_rows;
        let cols = self.params.db_cols;
        let dim = self.params.lwe_secret_dim;
        let mask = self.params.lwe_mask();
        debug_assert_eq!(matrix_a.len(), cols * dim);

        let row_products: Vec<Vec<u64>> = (0..rows)
            .into_par_iter()
            .map(|r| {
                let mut out = vec![0u64; dim];
                for c in 0..cols {
                    let d = self.cell(r, c);
                    if d == 0 {
                        continue;
                    }
                    let a_row = &matrix_a[c * dim..(c + 1) * dim];
                    for (o, &a) in out.iter_mut().zip(a_row.iter()) {
                        *o = o.wrapping_add(d.wrapping_mul(a));
                    }
                }
                for o in &mut out {
                    *o &= mask;
                }
                out
            })
            .collect();

        let block = self.params.linpir_params.rows_per_block;
        row_products
            .chunks(block)
            .map(|chunk| HintMatrix {
                rows: block,
                cols: dim,
                data: chunk.concat(),
            })
            .collect()
    }

    /// Compute `D·u` over the LWE modulus for a query vector of length
    /// `db_cols`.
    pub fn multiply(&self, u: &[u64]) -> Result<Vec<u64>> {
        let rows = self.params.db_rows;
        let cols = self.params.db_cols;
        if u.len() != cols {
            return Err(Error::Encoding(format!(
                "query length {} does not match db_cols {}",
                u.len(),
                cols
            )));
        }
        let mask = self.params.lwe_mask();

        Ok((0..rows)
            .into_par_iter()
            .map(|r| {
                let mut acc = 0u64;
                for (c, &uc) in u.iter().enumerate() {
                    acc = acc.wrapping_add(self.cell(r, c).wrapping_mul(uc));
                }
                acc & mask
            })
            .collect())
    }

    /// Decode record `i` back from the cell matrix.
    pub fn record(&self, i: usize) -> Result<Vec<u8>> {
        let loc = self.params.record_location(i)?;
        let record_bits = self.params.db_record_bit_size;
        let cell_bits = self.params.lwe_plaintext_bit_size;
        let base = loc.col * self.params.db_rows + loc.row;

        let mut bytes = vec![0u8; record_bits.div_ceil(8)];
        for bit in 0..record_bits {
            if (self.cells[base + bit / cell_bits] >> (bit % cell_bits)) & 1 == 1 {
                bytes[bit / 8] |= 1 << (bit % 8);
            }
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lwe;
    use crate::params::{PrngType, RlweParameters};

    fn test_params() -> Parameters {
        Parameters {
            db_rows: 16,
            db_cols: 16,
            db_record_bit_size: 8,
            lwe_secret_dim: 32,
            lwe_modulus_bit_size: 32,
            lwe_plaintext_bit_size: 8,
            lwe_error_variance: 8.0,
            linpir_params: RlweParameters {
                log_n: 8,
                qs: vec![281474976694273, 281474976636929],
                ts: vec![2056193, 1990657],
                gadget_log_bs: vec![16, 16],
                error_variance: 8.0,
                prng_type: PrngType::ChaCha20,
                rows_per_block: 8,
            },
            prng_type: PrngType::ChaCha20,
        }
    }

    #[test]
    fn test_record_roundtrip_byte_records() {
        let params = test_params();
        let records: Vec<Vec<u8>> = (0..params.num_records())
            .map(|i| vec![(i * 7 % 256) as u8])
            .collect();

        let db = Database::create(&params, &records).unwrap();
        for (i, record) in records.iter().enumerate() {
            assert_eq!(db.record(i).unwrap(), *record, "record {}", i);
        }
    }

    #[test]
    fn test_record_roundtrip_spanning() {
        let mut params = test_params();
        params.db_record_bit_size = 16;
        let records: Vec<Vec<u8>> = (0..params.num_records())
            .map(|i| vec![(i % 256) as u8, ((i * 13) % 256) as u8])
            .collect();

        let db = Database::create(&params, &records).unwrap();
        for (i, record) in records.iter().enumerate() {
            assert_eq!(db.record(i).unwrap(), *record, "record {}", i);
        }

        // A 16-bit record occupies two consecutive rows of one column.
        assert_eq!(db.cell(0, 0), records[0][0] as u64);
        assert_eq!(db.cell(1, 0), records[0][1] as u64);
    }

    #[test]
    fn test_record_roundtrip_sub_cell() {
        let mut params = test_params();
        params.db_record_bit_size = 4;
        let records: Vec<Vec<u8>> = (0..params.num_records())
            .map(|i| vec![(i % 16) as u8])
            .collect();

        let db = Database::create(&params, &records).unwrap();
        for (i, record) in records.iter().enumerate() {
            assert_eq!(db.record(i).unwrap(), *record);
        }
        // High cell bits stay clear.
        for r in 0..params.db_rows {
            assert!(db.cell(r, 0) < 16);
        }
    }

    #[test]
    fn test_oversized_record_rejected() {
        let mut params = test_params();
        params.db_record_bit_size = 4;
        // 0x1f has bits above the declared 4-bit width.
        let err = Database::create(&params, &[vec![0x1f]]);
        assert!(matches!(err, Err(Error::Encoding(_))));
    }

    #[test]
    fn test_too_many_records_rejected() {
        let params = test_params();
        let records: Vec<Vec<u8>> = (0..params.num_records() + 1).map(|_| vec![0]).collect();
        assert!(matches!(
            Database::create(&params, &records),
            Err(Error::Encoding(_))
        ));
    }

    #[test]
    fn test_record_index_boundaries() {
        let params = test_params();
        let db = Database::with_seeded_random_records(&params, [3u8; 32]).unwrap();

        assert!(db.record(0).is_ok());
        assert!(db.record(params.num_records() - 1).is_ok());
        assert!(matches!(
            db.record(params.num_records()),
            Err(Error::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_seeded_records_deterministic() {
        let params = test_params();
        let db1 = Database::with_seeded_random_records(&params, [9u8; 32]).unwrap();
        let db2 = Database::with_seeded_random_records(&params, [9u8; 32]).unwrap();
        for i in 0..db1.num_records() {
            assert_eq!(db1.record(i).unwrap(), db2.record(i).unwrap());
        }
    }

    #[test]
    fn test_multiply_one_hot_selects_column() {
        let params = test_params();
        let db = Database::with_seeded_random_records(&params, [5u8; 32]).unwrap();

        let col = 3;
        let mut u = vec![0u64; params.db_cols];
        u[col] = 1;

        let du = db.multiply(&u).unwrap();
        for r in 0..params.db_rows {
            assert_eq!(du[r], db.cell(r, col));
        }
    }

    #[test]
    fn test_multiply_length_mismatch() {
        let params = test_params();
        let db = Database::with_seeded_random_records(&params, [5u8; 32]).unwrap();
        assert!(db.multiply(&vec![0u64; params.db_cols + 1]).is_err());
    }

    #[test]
    fn test_hints_shape_and_reference_product() {
        let params = test_params();
        let db = Database::with_seeded_random_records(&params, [8u8; 32]).unwrap();

        let a = lwe::expand_matrix(
            [2u8; 32],
            params.prng_type,
            params.db_cols,
            params.lwe_secret_dim,
            params.lwe_mask(),
        );
        let hints = db.compute_hints(&a);

        assert_eq!(hints.len(), params.num_shards());
        for hint in &hints {
            assert_eq!(hint.rows, params.linpir_params.rows_per_block);
            assert_eq!(hint.cols, params.lwe_secret_dim);
        }

        // Spot-check one entry against the naive product.
        let (sh, r, k) = (1, 2, 7);
        let global_row = sh * params.linpir_params.rows_per_block + r;
        let mut expected = 0u64;
        for c in 0..params.db_cols {
            expected = expected.wrapping_add(
                db.cell(global_row, c)
                    .wrapping_mul(a[c * params.lwe_secret_dim + k]),
            );
        }
        expected &= params.lwe_mask();
        assert_eq!(hints[sh].at(r, k), expected);
    }
}

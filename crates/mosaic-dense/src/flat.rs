//! Exhaustive vector index and its FAISS on-disk form.
//!
//! [`FlatIndex`] stores vectors row-major and answers queries with a full
//! scan. [`write_faiss`] and [`read_faiss`] use the layout FAISS writes for
//! `IndexFlatIP` / `IndexFlatL2`, so `index.faiss` loads directly with
//! `faiss.read_index`.
//!
//! # File layout (little-endian)
//!
//! | Field | Type | Notes |
//! |-------|------|-------|
//! | fourcc | `[u8; 4]` | `IxFI` (inner product) or `IxF2` (L2) |
//! | d | `i32` | dimension |
//! | ntotal | `i64` | number of vectors |
//! | dummy ×2 | `i64` | always `1 << 20` |
//! | is_trained | `u8` | always 1 |
//! | metric_type | `i32` | 0 = inner product, 1 = L2 |
//! | code count | `u64` | `d * ntotal` |
//! | codes | `f32 × count` | row-major vectors |

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use mosaic_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::io::{Read, Write};

const FOURCC_IP: &[u8; 4] = b"IxFI";
const FOURCC_L2: &[u8; 4] = b"IxF2";
const HEADER_DUMMY: i64 = 1 << 20;

/// Distance used to rank neighbours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Dot product; cosine similarity when vectors are normalized.
    #[default]
    #[serde(alias = "ip")]
    InnerProduct,
    /// Squared Euclidean distance.
    L2,
}

impl Metric {
    /// FAISS `MetricType` value.
    pub fn faiss_code(self) -> i32 {
        match self {
            Self::InnerProduct => 0,
            Self::L2 => 1,
        }
    }

    fn fourcc(self) -> &'static [u8; 4] {
        match self {
            Self::InnerProduct => FOURCC_IP,
            Self::L2 => FOURCC_L2,
        }
    }

    /// Score a candidate; higher is always better.
    fn score(self, query: &[f32], row: &[f32]) -> f32 {
        match self {
            Self::InnerProduct => query.iter().zip(row).map(|(a, b)| a * b).sum(),
            Self::L2 => -query
                .iter()
                .zip(row)
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f32>(),
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InnerProduct => write!(f, "inner_product"),
            Self::L2 => write!(f, "l2"),
        }
    }
}

impl std::str::FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inner_product" | "ip" => Ok(Self::InnerProduct),
            "l2" => Ok(Self::L2),
            other => Err(Error::parse(format!(
                "unknown metric '{other}' (expected inner_product or l2)"
            ))),
        }
    }
}

/// Row-major flat vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    metric: Metric,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index.
    pub fn new(dimension: usize, metric: Metric) -> Self {
        Self {
            dimension,
            metric,
            data: Vec::new(),
        }
    }

    /// Vector dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Ranking metric.
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    /// True when no vectors are stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append one vector.
    pub fn add(&mut self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::invalid_data(format!(
                "vector has dimension {}, index expects {}",
                vector.len(),
                self.dimension
            )));
        }
        self.data.extend_from_slice(vector);
        Ok(())
    }

    /// Stored vector at `row`.
    pub fn vector(&self, row: usize) -> Option<&[f32]> {
        let start = row.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// The `k` best rows for `query` as `(row, score)`, best first.
    ///
    /// Scores are inner products, or negated squared distances for L2.
    /// Ties keep the lower row first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(Error::invalid_data(format!(
                "query has dimension {}, index expects {}",
                query.len(),
                self.dimension
            )));
        }
        if k == 0 || self.dimension == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(row, vec)| (row, self.metric.score(query, vec)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored)
    }
}

// ============================================================================
// FAISS codec
// ============================================================================

/// Write `index` in the FAISS `IndexFlat` binary layout.
pub fn write_faiss<W: Write>(index: &FlatIndex, mut writer: W) -> Result<()> {
    let d = i32::try_from(index.dimension)
        .map_err(|_| Error::invalid_data("dimension does not fit in i32"))?;
    let ntotal = i64::try_from(index.len())
        .map_err(|_| Error::invalid_data("vector count does not fit in i64"))?;

    writer.write_all(index.metric.fourcc())?;
    writer.write_i32::<LittleEndian>(d)?;
    writer.write_i64::<LittleEndian>(ntotal)?;
    writer.write_i64::<LittleEndian>(HEADER_DUMMY)?;
    writer.write_i64::<LittleEndian>(HEADER_DUMMY)?;
    writer.write_u8(1)?;
    writer.write_i32::<LittleEndian>(index.metric.faiss_code())?;

    writer.write_u64::<LittleEndian>(index.data.len() as u64)?;
    for value in &index.data {
        writer.write_f32::<LittleEndian>(*value)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read an index written by [`write_faiss`] (or by FAISS for a flat index).
pub fn read_faiss<R: Read>(mut reader: R) -> Result<FlatIndex> {
    let mut fourcc = [0u8; 4];
    reader.read_exact(&mut fourcc)?;
    let metric = match &fourcc {
        FOURCC_IP => Metric::InnerProduct,
        FOURCC_L2 => Metric::L2,
        other => {
            return Err(Error::invalid_data(format!(
                "unsupported index type {:?}",
                String::from_utf8_lossy(other)
            )));
        }
    };

    let d = reader.read_i32::<LittleEndian>()?;
    let ntotal = reader.read_i64::<LittleEndian>()?;
    let _dummy = reader.read_i64::<LittleEndian>()?;
    let _dummy = reader.read_i64::<LittleEndian>()?;
    let _is_trained = reader.read_u8()?;
    let metric_code = reader.read_i32::<LittleEndian>()?;
    if metric_code != metric.faiss_code() {
        return Err(Error::invalid_data(format!(
            "metric type {metric_code} does not match {metric} header"
        )));
    }

    let dimension =
        usize::try_from(d).map_err(|_| Error::invalid_data(format!("negative dimension {d}")))?;
    let rows = usize::try_from(ntotal)
        .map_err(|_| Error::invalid_data(format!("negative vector count {ntotal}")))?;

    let count = reader.read_u64::<LittleEndian>()?;
    let expected = dimension
        .checked_mul(rows)
        .ok_or_else(|| Error::invalid_data("index size overflows"))?;
    if count != expected as u64 {
        return Err(Error::invalid_data(format!(
            "code count {count} does not match {rows} vectors of dimension {dimension}"
        )));
    }

    let mut data = vec![0f32; expected];
    reader.read_f32_into::<LittleEndian>(&mut data)?;

    Ok(FlatIndex {
        dimension,
        metric,
        data,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn small_index(metric: Metric) -> FlatIndex {
        let mut index = FlatIndex::new(3, metric);
        index.add(&[1.0, 0.0, 0.0]).unwrap();
        index.add(&[0.0, 1.0, 0.0]).unwrap();
        index.add(&[0.6, 0.8, 0.0]).unwrap();
        index
    }

    #[test]
    fn test_add_and_len() {
        let index = small_index(Metric::InnerProduct);
        assert_eq!(index.len(), 3);
        assert!(!index.is_empty());
        assert_eq!(index.vector(1), Some(&[0.0, 1.0, 0.0][..]));
        assert_eq!(index.vector(3), None);
    }

    #[test]
    fn test_add_wrong_dimension() {
        let mut index = FlatIndex::new(3, Metric::InnerProduct);
        let err = index.add(&[1.0, 2.0]).unwrap_err();
        assert!(err.to_string().contains("dimension 2"));
        assert!(index.is_empty());
    }

    #[test]
    fn test_search_inner_product() {
        let index = small_index(Metric::InnerProduct);
        let hits = index.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, 0);
        assert!((hits[0].1 - 1.0).abs() < 1e-6);
        assert_eq!(hits[1].0, 2);
        assert!((hits[1].1 - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_search_l2() {
        let index = small_index(Metric::L2);
        let hits = index.search(&[0.0, 0.9, 0.0], 1).unwrap();
        assert_eq!(hits[0].0, 1);
        assert!(hits[0].1 <= 0.0);
    }

    #[test]
    fn test_search_ties_keep_row_order() {
        let mut index = FlatIndex::new(2, Metric::InnerProduct);
        index.add(&[1.0, 0.0]).unwrap();
        index.add(&[1.0, 0.0]).unwrap();
        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].0, 0);
        assert_eq!(hits[1].0, 1);
    }

    #[test]
    fn test_search_edge_cases() {
        let index = small_index(Metric::InnerProduct);
        assert!(index.search(&[1.0, 0.0, 0.0], 0).unwrap().is_empty());
        assert_eq!(index.search(&[1.0, 0.0, 0.0], 10).unwrap().len(), 3);
        assert!(index.search(&[1.0], 1).is_err());

        let empty = FlatIndex::new(3, Metric::InnerProduct);
        assert!(empty.search(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_write_faiss_header_bytes() {
        let index = small_index(Metric::InnerProduct);
        let mut buf = Vec::new();
        write_faiss(&index, &mut buf).unwrap();

        assert_eq!(&buf[0..4], b"IxFI");
        assert_eq!(i32::from_le_bytes(buf[4..8].try_into().unwrap()), 3);
        assert_eq!(i64::from_le_bytes(buf[8..16].try_into().unwrap()), 3);
        assert_eq!(i64::from_le_bytes(buf[16..24].try_into().unwrap()), 1 << 20);
        assert_eq!(buf[32], 1);
        assert_eq!(i32::from_le_bytes(buf[33..37].try_into().unwrap()), 0);
        assert_eq!(u64::from_le_bytes(buf[37..45].try_into().unwrap()), 9);
        assert_eq!(buf.len(), 45 + 9 * 4);
    }

    #[test]
    fn test_faiss_round_trip() {
        for metric in [Metric::InnerProduct, Metric::L2] {
            let index = small_index(metric);
            let mut buf = Vec::new();
            write_faiss(&index, &mut buf).unwrap();
            let loaded = read_faiss(buf.as_slice()).unwrap();
            assert_eq!(loaded, index);
        }
    }

    #[test]
    fn test_faiss_empty_index() {
        let index = FlatIndex::new(384, Metric::InnerProduct);
        let mut buf = Vec::new();
        write_faiss(&index, &mut buf).unwrap();

        let loaded = read_faiss(buf.as_slice()).unwrap();
        assert_eq!(loaded.dimension(), 384);
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_read_faiss_rejects_other_index_types() {
        let mut buf = b"IHNf".to_vec();
        buf.extend_from_slice(&[0u8; 64]);
        let err = read_faiss(buf.as_slice()).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_read_faiss_rejects_bad_count() {
        let index = small_index(Metric::InnerProduct);
        let mut buf = Vec::new();
        write_faiss(&index, &mut buf).unwrap();
        buf[37..45].copy_from_slice(&8u64.to_le_bytes());
        assert!(read_faiss(buf.as_slice()).is_err());
    }

    #[test]
    fn test_read_faiss_truncated() {
        let index = small_index(Metric::InnerProduct);
        let mut buf = Vec::new();
        write_faiss(&index, &mut buf).unwrap();
        buf.truncate(buf.len() - 4);
        assert!(matches!(read_faiss(buf.as_slice()), Err(Error::Io(_))));
    }

    #[test]
    fn test_metric_display_and_serde() {
        assert_eq!(Metric::InnerProduct.to_string(), "inner_product");
        assert_eq!(Metric::L2.to_string(), "l2");
        assert_eq!(
            serde_json::to_string(&Metric::InnerProduct).unwrap(),
            "\"inner_product\""
        );
        let parsed: Metric = serde_json::from_str("\"l2\"").unwrap();
        assert_eq!(parsed, Metric::L2);
    }

    #[test]
    fn test_metric_from_str() {
        assert_eq!("inner_product".parse::<Metric>().unwrap(), Metric::InnerProduct);
        assert_eq!("IP".parse::<Metric>().unwrap(), Metric::InnerProduct);
        assert_eq!(" l2 ".parse::<Metric>().unwrap(), Metric::L2);
        assert!("cosine".parse::<Metric>().is_err());
    }
}

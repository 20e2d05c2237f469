//! GETBULK splitting (RFC 3416 Section 4.2.3).
//!
//! The first `non_repeaters` varbinds get one GETNEXT each. The remaining
//! varbinds are walked `max_repetitions` times, each row starting from the
//! OIDs the previous row returned.

use std::future::Future;

use crate::error::ErrorStatus;
use crate::oid::Oid;
use crate::value::AsnValue;
use crate::varbind::VarBind;

use super::Pdu;

/// A failed GETNEXT inside a bulk walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkFailure {
    pub status: ErrorStatus,
    /// 1-based index of the request varbind that failed, 0 if none applies.
    pub index: i32,
}

/// Clamped GETBULK parameters for a request of a given length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkSplit {
    non_repeaters: usize,
    max_repetitions: usize,
    size_limit: Option<usize>,
}

impl BulkSplit {
    /// `non_repeaters` is clamped to `[0, len]`, `max_repetitions` to `>= 0`.
    pub fn new(non_repeaters: i32, max_repetitions: i32, len: usize) -> Self {
        Self {
            non_repeaters: usize::try_from(non_repeaters).unwrap_or(0).min(len),
            max_repetitions: usize::try_from(max_repetitions).unwrap_or(0),
            size_limit: None,
        }
    }

    pub fn from_pdu(pdu: &Pdu) -> Self {
        Self::new(pdu.non_repeaters, pdu.max_repetitions, pdu.varbinds.len())
    }

    /// Stop adding rows once the encoded varbinds would exceed `bytes`.
    ///
    /// If the non-repeater results alone exceed it, the walk fails with
    /// `tooBig`.
    pub fn with_size_limit(mut self, bytes: usize) -> Self {
        self.size_limit = Some(bytes);
        self
    }

    pub fn non_repeaters(&self) -> usize {
        self.non_repeaters
    }

    pub fn max_repetitions(&self) -> usize {
        self.max_repetitions
    }

    /// Run the walk, calling `next` once per GETNEXT.
    ///
    /// `next` returns the successor varbind, or an `endOfMibView` value when
    /// the view is exhausted. A repeater that reached the end keeps reporting
    /// `endOfMibView` without calling `next` again. The walk stops after the
    /// first row in which every repeater has ended.
    pub async fn resolve<F, Fut>(
        &self,
        request: &[VarBind],
        mut next: F,
    ) -> Result<Vec<VarBind>, BulkFailure>
    where
        F: FnMut(Oid) -> Fut,
        Fut: Future<Output = Result<VarBind, ErrorStatus>>,
    {
        let split = self.non_repeaters.min(request.len());
        let (fixed, repeating) = request.split_at(split);
        let limit = self.size_limit.unwrap_or(usize::MAX);

        let mut out = Vec::with_capacity(split + repeating.len().min(64));
        let mut used = 0usize;

        for (i, vb) in fixed.iter().enumerate() {
            let result = next(vb.oid.clone()).await.map_err(|status| BulkFailure {
                status,
                index: to_index(i),
            })?;
            used += result.encoded_size();
            if used > limit {
                return Err(BulkFailure {
                    status: ErrorStatus::TooBig,
                    index: 0,
                });
            }
            out.push(result);
        }

        if repeating.is_empty() {
            return Ok(out);
        }

        let mut current: Vec<Oid> = repeating.iter().map(|vb| vb.oid.clone()).collect();
        let mut done = vec![false; repeating.len()];

        for _ in 0..self.max_repetitions {
            let mut row = Vec::with_capacity(repeating.len());
            for (j, oid) in current.iter_mut().enumerate() {
                if done[j] {
                    row.push(VarBind::new(oid.clone(), AsnValue::end_of_mib_view()));
                    continue;
                }
                let result = next(oid.clone()).await.map_err(|status| BulkFailure {
                    status,
                    index: to_index(split + j),
                })?;
                if result.value.as_exception().is_some() {
                    done[j] = true;
                }
                oid.clone_from(&result.oid);
                row.push(result);
            }

            let row_size: usize = row.iter().map(VarBind::encoded_size).sum();
            if used + row_size > limit {
                tracing::trace!(target: "snmp_stack::agent", { rows = (out.len() - split) / repeating.len() }, "bulk response truncated to fit");
                break;
            }
            used += row_size;
            out.extend(row);

            if done.iter().all(|d| *d) {
                break;
            }
        }

        Ok(out)
    }
}

fn to_index(zero_based: usize) -> i32 {
    i32::try_from(zero_based + 1).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    fn mib() -> Vec<Oid> {
        vec![
            oid!(1, 3, 6, 1, 2, 1, 1, 1, 0),
            oid!(1, 3, 6, 1, 2, 1, 1, 3, 0),
            oid!(1, 3, 6, 1, 2, 1, 1, 5, 0),
        ]
    }

    async fn next_in(mib: &[Oid], oid: Oid) -> Result<VarBind, ErrorStatus> {
        Ok(match mib.iter().find(|o| **o > oid) {
            Some(o) => VarBind::new(o.clone(), AsnValue::integer(o.arcs()[7] as i64)),
            None => VarBind::new(oid, AsnValue::end_of_mib_view()),
        })
    }

    #[test]
    fn test_clamping() {
        let split = BulkSplit::new(-3, -1, 2);
        assert_eq!(split.non_repeaters(), 0);
        assert_eq!(split.max_repetitions(), 0);
        assert_eq!(BulkSplit::new(10, 5, 2).non_repeaters(), 2);
    }

    #[tokio::test]
    async fn test_one_non_repeater_three_repetitions() {
        let mib = mib();
        let request = vec![
            VarBind::null(oid!(1, 3, 6, 1, 2, 1, 1, 1)),
            VarBind::null(oid!(1, 3, 6, 1, 2, 1, 1)),
        ];
        let out = BulkSplit::new(1, 3, request.len())
            .resolve(&request, |oid| next_in(&mib, oid))
            .await
            .unwrap();

        assert_eq!(out.len(), 4);
        assert_eq!(out[0].oid, oid!(1, 3, 6, 1, 2, 1, 1, 1, 0));
        assert_eq!(out[1].oid, oid!(1, 3, 6, 1, 2, 1, 1, 1, 0));
        assert_eq!(out[2].oid, oid!(1, 3, 6, 1, 2, 1, 1, 3, 0));
        assert_eq!(out[3].oid, oid!(1, 3, 6, 1, 2, 1, 1, 5, 0));
    }

    #[tokio::test]
    async fn test_stops_when_all_repeaters_ended() {
        let mib = mib();
        let request = vec![
            VarBind::null(oid!(1, 3, 6, 1, 2, 1, 1, 3, 0)),
            VarBind::null(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)),
        ];
        let out = BulkSplit::new(0, 10, request.len())
            .resolve(&request, |oid| next_in(&mib, oid))
            .await
            .unwrap();

        // row 1: 5.0, 3.0; row 2: end, 5.0; row 3: end, end
        assert_eq!(out.len(), 6);
        assert_eq!(out[2].value, AsnValue::end_of_mib_view());
        assert_eq!(out[2].oid, oid!(1, 3, 6, 1, 2, 1, 1, 5, 0));
        assert_eq!(out[4].value, AsnValue::end_of_mib_view());
        assert_eq!(out[5].value, AsnValue::end_of_mib_view());
    }

    #[tokio::test]
    async fn test_failure_reports_request_index() {
        let request = vec![
            VarBind::null(oid!(1, 3, 6, 1)),
            VarBind::null(oid!(1, 3, 6, 2)),
            VarBind::null(oid!(1, 3, 6, 3)),
        ];
        let err = BulkSplit::new(1, 2, request.len())
            .resolve(&request, |oid| async move {
                if oid.starts_with(&oid!(1, 3, 6, 3)) {
                    Err(ErrorStatus::GenErr)
                } else {
                    Ok(VarBind::new(oid.child(1), 1i64))
                }
            })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BulkFailure {
                status: ErrorStatus::GenErr,
                index: 3
            }
        );
    }

    #[tokio::test]
    async fn test_size_limit_drops_trailing_rows() {
        let request = vec![VarBind::null(oid!(1, 3, 6, 1))];
        let row_size = VarBind::new(oid!(1, 3, 6, 1, 1), 1i64).encoded_size();
        let out = BulkSplit::new(0, 50, 1)
            .with_size_limit(row_size * 3)
            .resolve(&request, |oid| async move { Ok(VarBind::new(oid.child(1), 1i64)) })
            .await
            .unwrap();
        // OIDs grow by one arc per row, so the third row no longer fits.
        assert_eq!(out.len(), 2);
    }

    #[tokio::test]
    async fn test_non_repeaters_too_big() {
        let request = vec![VarBind::null(oid!(1, 3, 6, 1))];
        let err = BulkSplit::new(1, 0, 1)
            .with_size_limit(4)
            .resolve(&request, |oid| async move { Ok(VarBind::new(oid.child(1), 1i64)) })
            .await
            .unwrap_err();
        assert_eq!(err.status, ErrorStatus::TooBig);
    }
}

//! Brand cross-check between the invoice, the packing list and the carrier remarks.
//!
//! The invoice decides the brand; the two collaborator documents must mention
//! the same keyword or the run stops before any report is built.

use tracing::{debug, warn};

use crate::config::BrandProfile;
use crate::error::{DeclError, DocumentMismatch};
use crate::model::Table;

/// Longest snippet of detected text quoted back in an error.
const SNIPPET_CHARS: usize = 60;

/// Text excerpts searched by the brand check.
#[derive(Debug, Clone, Default)]
pub struct BrandExcerpts {
    pub invoice: String,
    pub packing: String,
    pub carrier_remark: String,
}

impl BrandExcerpts {
    pub fn from_sources(invoice: &Table, packing: &Table, export_detail: &Table, remark_column: usize) -> Self {
        let carrier_remark = export_detail
            .column(remark_column)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            invoice: invoice.text(),
            packing: packing.text(),
            carrier_remark,
        }
    }
}

/// Identify the brand named on the invoice and confirm the collaborators agree.
///
/// Profiles are tried in order; the first keyword found in the invoice wins.
pub fn identify_brand<'a>(
    excerpts: &BrandExcerpts,
    profiles: &'a [BrandProfile],
) -> Result<&'a BrandProfile, DeclError> {
    let brand = profiles
        .iter()
        .find(|p| excerpts.invoice.contains(p.keyword.as_str()))
        .ok_or_else(|| DeclError::BrandNotIdentified {
            invoice_excerpt: snippet(&excerpts.invoice),
        })?;
    debug!(keyword = %brand.keyword, "brand identified on invoice");

    let mismatches: Vec<DocumentMismatch> = [
        ("packing", &excerpts.packing),
        ("carrier remark", &excerpts.carrier_remark),
    ]
    .into_iter()
    .filter(|(_, text)| !text.contains(brand.keyword.as_str()))
    .map(|(document, text)| DocumentMismatch {
        document: document.to_string(),
        detected: snippet(text),
    })
    .collect();

    if !mismatches.is_empty() {
        warn!(keyword = %brand.keyword, documents = mismatches.len(), "brand mismatch");
        return Err(DeclError::BrandMismatch {
            keyword: brand.keyword.clone(),
            mismatches,
        });
    }

    Ok(brand)
}

fn snippet(text: &str) -> String {
    let mut out: String = text.chars().take(SNIPPET_CHARS).collect();
    if text.chars().count() > SNIPPET_CHARS {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profiles() -> Vec<BrandProfile> {
        vec![
            BrandProfile {
                keyword: "TRUU".into(),
                english_name: "COSMETICS".into(),
                brand_label: "TRUU+TRUE YOU".into(),
                file_suffix: "GM".into(),
            },
            BrandProfile {
                keyword: "蜜凱".into(),
                english_name: "SKIN CARE".into(),
                brand_label: "MIKAI".into(),
                file_suffix: "MK".into(),
            },
        ]
    }

    fn excerpts(invoice: &str, packing: &str, remark: &str) -> BrandExcerpts {
        BrandExcerpts {
            invoice: invoice.into(),
            packing: packing.into(),
            carrier_remark: remark.into(),
        }
    }

    #[test]
    fn all_documents_agree() {
        let p = profiles();
        let brand = identify_brand(&excerpts("INVOICE 蜜凱 精華", "蜜凱 PACKING", "蜜凱"), &p).unwrap();
        assert_eq!(brand.brand_label, "MIKAI");
    }

    #[test]
    fn first_matching_profile_wins() {
        let p = profiles();
        let brand = identify_brand(&excerpts("TRUU x 蜜凱", "TRUU 蜜凱", "TRUU 蜜凱"), &p).unwrap();
        assert_eq!(brand.keyword, "TRUU");
    }

    #[test]
    fn no_profile_on_invoice() {
        let err = identify_brand(&excerpts("GENERIC GOODS", "TRUU", "TRUU"), &profiles()).unwrap_err();
        match err {
            DeclError::BrandNotIdentified { invoice_excerpt } => {
                assert_eq!(invoice_excerpt, "GENERIC GOODS")
            }
            other => panic!("expected BrandNotIdentified, got {other:?}"),
        }
    }

    #[test]
    fn packing_without_keyword_is_named() {
        let err = identify_brand(&excerpts("蜜凱 invoice", "TRUU packing", "蜜凱 remark"), &profiles())
            .unwrap_err();
        match err {
            DeclError::BrandMismatch { keyword, mismatches } => {
                assert_eq!(keyword, "蜜凱");
                assert_eq!(mismatches.len(), 1);
                assert_eq!(mismatches[0].document, "packing");
                assert_eq!(mismatches[0].detected, "TRUU packing");
            }
            other => panic!("expected BrandMismatch, got {other:?}"),
        }
    }

    #[test]
    fn both_collaborators_listed() {
        let err = identify_brand(&excerpts("TRUU", "", ""), &profiles()).unwrap_err();
        let DeclError::BrandMismatch { mismatches, .. } = err else {
            panic!("expected BrandMismatch");
        };
        let docs: Vec<_> = mismatches.iter().map(|m| m.document.as_str()).collect();
        assert_eq!(docs, vec!["packing", "carrier remark"]);
    }

    #[test]
    fn snippet_is_bounded() {
        let long = "x".repeat(200);
        let s = snippet(&long);
        assert_eq!(s.chars().count(), SNIPPET_CHARS + 1);
        assert!(s.ends_with('…'));
    }

    #[test]
    fn excerpts_from_tables() {
        let invoice = Table::new("inv", vec![vec!["".into(), "蜜凱 INVOICE".into()]]);
        let packing = Table::new("pk", vec![vec!["PL-001".into(), "蜜凱".into()]]);
        let export = Table::new(
            "export",
            vec![
                vec!["1".into(), "H1".into(), "蜜凱 lotion".into()],
                vec!["2".into(), "H2".into()],
            ],
        );
        let ex = BrandExcerpts::from_sources(&invoice, &packing, &export, 2);
        assert_eq!(ex.invoice, "蜜凱 INVOICE");
        assert_eq!(ex.packing, "PL-001 蜜凱");
        assert_eq!(ex.carrier_remark, "蜜凱 lotion");
    }
}

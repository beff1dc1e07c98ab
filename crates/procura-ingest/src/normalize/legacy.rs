//! Mapper for the legacy `item`/`value` documents.
//!
//! Leaves are either the scalar itself or a small node whose `valor` item
//! holds the label and `codigo` the identifier.

use procura_core::{
    CodedValue, Contract, Offerer, OffererCount, RawTree, Resolution, Winner, parse_amount_legacy,
    parse_bool, parse_date,
};

use super::valid_budget;
use crate::{Dialect, NormalizeError};

const ROOT: &str = "contratacion";
const VALUE: &str = "valor";
const CODE: &str = "codigo";
const AWARD_REPORT: &str = "contratacion_informe_adjudicacion_definitiva";

pub(super) fn map(tree: &RawTree, contract: &mut Contract) -> Result<(), NormalizeError> {
    let node = tree.get(ROOT).ok_or(NormalizeError::Structure {
        dialect: Dialect::Legacy,
        path: ROOT,
    })?;

    contract.title = leaf(node.get("contratacion_titulo_contrato"));

    let authority = node
        .get("contratacion_autoridad_contratacion")
        .filter(|a| !leaf(Some(*a)).is_empty())
        .or_else(|| node.get("contratacion_poder_adjudicador"));
    contract.authority.name = leaf(authority);
    contract.authority.code = code(authority);

    contract.budget = node
        .get("contratacion_presupuesto_con_iva")
        .map(|b| leaf(Some(b)))
        .filter(|raw| !raw.is_empty())
        .and_then(|raw| valid_budget(parse_amount_legacy(&raw)));

    contract.status = coded(node.get("contratacion_estado_contrato"));
    contract.contract_type = coded(node.get("contratacion_tipo_contrato"));
    contract.processing_type = coded(node.get("contratacion_tramitacion"));
    contract.adjudication_procedure = coded(node.get("contratacion_procedimiento_adjudicacion"));

    contract.minor_contract = node
        .get("contratacion_contrato_menor")
        .map(|m| parse_bool(Some(leaf(Some(m)).to_lowercase().as_str())));

    contract.offerer_count =
        OffererCount::from_raw(&leaf(node.get("contratacion_numero_licitadores")));
    contract.offerers = offerers(node.get("licitadores"));

    for (i, award) in awards(node.get(AWARD_REPORT)).into_iter().enumerate() {
        contract.winners.insert(
            i,
            Winner {
                cif: leaf(award.get("cif")),
                name: leaf(award.get("empresa")),
                slug: String::new(),
            },
        );
        contract.resolutions.insert(
            i,
            Resolution {
                price_with_vat: parse_amount_legacy(&leaf(award.get("precioIVA"))),
                adjudication_date: parse_date(Some(leaf(award.get("fechaAdjudicacion")).as_str())),
            },
        );
    }

    Ok(())
}

/// Scalar text, or the `valor` item of a node.
fn leaf(value: Option<&RawTree>) -> String {
    let text = match value {
        Some(RawTree::Scalar(s)) => s.as_str(),
        Some(node) => node.get(VALUE).and_then(RawTree::as_scalar).unwrap_or_default(),
        None => "",
    };
    text.trim().to_string()
}

fn code(value: Option<&RawTree>) -> String {
    value
        .and_then(|v| v.get(CODE))
        .and_then(RawTree::as_scalar)
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn coded(value: Option<&RawTree>) -> CodedValue {
    CodedValue::new(leaf(value), code(value))
}

/// Offerers carry name and cif only.
fn offerers(value: Option<&RawTree>) -> Vec<Offerer> {
    let Some(list) = value.and_then(RawTree::as_node) else {
        return Vec::new();
    };
    list.iter()
        .map(|(_, entry)| match entry {
            RawTree::Scalar(name) => Offerer {
                name: name.trim().to_string(),
                ..Default::default()
            },
            node => Offerer {
                name: leaf(node.get("empresa")),
                cif: leaf(node.get("cif")),
                ..Default::default()
            },
        })
        .filter(|o| !o.name.is_empty() || !o.cif.is_empty())
        .collect()
}

/// Award entries in document order. A report holding `empresa` directly is a
/// single award.
fn awards(report: Option<&RawTree>) -> Vec<&RawTree> {
    let Some(report) = report else {
        return Vec::new();
    };
    if report.contains_key("empresa") {
        return vec![report];
    }
    report
        .as_node()
        .map(|entries| {
            entries
                .iter()
                .map(|(_, award)| award)
                .filter(|award| award.as_node().is_some())
                .collect()
        })
        .unwrap_or_default()
}

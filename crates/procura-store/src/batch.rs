//! Contracts → Arrow record batch in the canonical contract schema.

use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Date32Array, Float64Array, Float64Builder, Int32Array, ListBuilder,
    StringArray, StringBuilder,
};
use arrow::datatypes::Date32Type;
use arrow::record_batch::RecordBatch;
use procura_core::{CodedValue, Contract, contracts::contract_schema};

use crate::StoreError;

/// One row per contract. Winner and award columns follow index order.
pub fn contracts_to_batch(contracts: &[Contract]) -> Result<RecordBatch, StoreError> {
    let columns: Vec<ArrayRef> = vec![
        utf8(contracts, |c| c.id.as_str()),
        Arc::new(Int32Array::from_iter_values(contracts.iter().map(|c| c.year))),
        utf8(contracts, |c| c.language.as_str()),
        utf8(contracts, |c| c.title.as_str()),
        utf8(contracts, |c| c.authority.name.as_str()),
        utf8(contracts, |c| c.authority.cif.as_str()),
        utf8(contracts, |c| c.authority.code.as_str()),
        utf8(contracts, |c| c.authority.slug.as_str()),
        Arc::new(Float64Array::from_iter(contracts.iter().map(|c| c.budget))),
        coded_name(contracts, |c| &c.status),
        coded_code(contracts, |c| &c.status),
        coded_name(contracts, |c| &c.contract_type),
        coded_code(contracts, |c| &c.contract_type),
        coded_name(contracts, |c| &c.processing_type),
        coded_code(contracts, |c| &c.processing_type),
        coded_name(contracts, |c| &c.adjudication_procedure),
        coded_code(contracts, |c| &c.adjudication_procedure),
        Arc::new(BooleanArray::from_iter(contracts.iter().map(|c| c.minor_contract))),
        Arc::new(StringArray::from_iter_values(
            contracts.iter().map(|c| c.offerer_count.to_string()),
        )),
        utf8_list(contracts, |c| c.offerers.iter().map(|o| o.name.as_str()).collect()),
        utf8_list(contracts, |c| c.offerers.iter().map(|o| o.cif.as_str()).collect()),
        utf8_list(contracts, |c| c.winners.values().map(|w| w.name.as_str()).collect()),
        utf8_list(contracts, |c| c.winners.values().map(|w| w.cif.as_str()).collect()),
        utf8_list(contracts, |c| c.winners.values().map(|w| w.slug.as_str()).collect()),
        award_prices(contracts),
        Arc::new(Date32Array::from_iter(contracts.iter().map(|c| {
            c.first_resolution()
                .and_then(|r| r.adjudication_date)
                .map(Date32Type::from_naive_date)
        }))),
    ];

    Ok(RecordBatch::try_new(Arc::new(contract_schema()), columns)?)
}

fn utf8(contracts: &[Contract], field: impl Fn(&Contract) -> &str) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(contracts.iter().map(field)))
}

fn coded_name(contracts: &[Contract], field: impl Fn(&Contract) -> &CodedValue) -> ArrayRef {
    utf8(contracts, |c| field(c).name.as_str())
}

fn coded_code(contracts: &[Contract], field: impl Fn(&Contract) -> &CodedValue) -> ArrayRef {
    utf8(contracts, |c| field(c).code.as_str())
}

fn utf8_list(contracts: &[Contract], values: impl Fn(&Contract) -> Vec<&str>) -> ArrayRef {
    let mut builder = ListBuilder::new(StringBuilder::new());
    for contract in contracts {
        for value in values(contract) {
            builder.values().append_value(value);
        }
        builder.append(true);
    }
    Arc::new(builder.finish())
}

fn award_prices(contracts: &[Contract]) -> ArrayRef {
    let mut builder = ListBuilder::new(Float64Builder::new());
    for contract in contracts {
        for resolution in contract.resolutions.values() {
            builder.values().append_value(resolution.price_with_vat);
        }
        builder.append(true);
    }
    Arc::new(builder.finish())
}

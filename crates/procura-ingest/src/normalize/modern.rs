//! Mapper for `contractingAnnouncement` documents.

use procura_core::{
    CodedValue, Contract, Offerer, OffererCount, RawTree, Resolution, Winner, parse_amount,
    parse_amount_legacy, parse_bool, parse_date, to_list,
};

use super::{text_or_empty, valid_budget};
use crate::{Dialect, NormalizeError};

const MINOR_CONTRACT_FLAG: &str = "contrato_menor";

pub(super) fn map(tree: &RawTree, contract: &mut Contract) -> Result<(), NormalizeError> {
    let node = tree
        .path(&["contractingAnnouncement", "contracting"])
        .ok_or(NormalizeError::Structure {
            dialect: Dialect::Modern,
            path: "contractingAnnouncement/contracting",
        })?;
    let flags = node
        .path(&["flags", "flag"])
        .ok_or(NormalizeError::Structure {
            dialect: Dialect::Modern,
            path: "contracting/flags/flag",
        })?;

    contract.title = text_or_empty(node.get("subject"));

    let authority = node.get("contractingAuthority");
    contract.authority.name = text_or_empty(authority.and_then(|a| a.get("name")));
    contract.authority.code = authority
        .and_then(|a| a.get("code"))
        .and_then(RawTree::text)
        .or_else(|| authority.and_then(|a| a.attr("id")))
        .unwrap_or_default()
        .trim()
        .to_string();

    contract.budget = node
        .get("budgetWithVAT")
        .and_then(RawTree::text)
        .filter(|raw| !raw.trim().is_empty())
        .and_then(|raw| valid_budget(parse_amount_legacy(raw)));

    contract.status = coded(node.get("processingStatus"));
    contract.contract_type = coded(node.get("contractingType"));
    contract.processing_type = coded(node.get("processing"));
    contract.adjudication_procedure = coded(node.get("adjudicationProcedure"));

    contract.minor_contract = to_list(Some(flags))
        .into_iter()
        .find(|flag| flag.attr("id") == Some(MINOR_CONTRACT_FLAG))
        .map(|flag| parse_bool(flag.text()));

    let offers = node.get("offersManagement");
    contract.offerers = to_list(offers.and_then(|o| o.get("offerManagement")))
        .into_iter()
        .map(offerer)
        .collect();
    contract.offerer_count =
        OffererCount::from_raw(&text_or_empty(offers.and_then(|o| o.get("numberOfOffers"))));

    let formalizations = node.path(&["formalizations", "formalization"]);
    for (i, formalization) in to_list(formalizations).into_iter().enumerate() {
        contract.winners.insert(
            i,
            Winner {
                cif: text_or_empty(formalization.get("id")),
                name: text_or_empty(formalization.get("businessName")),
                slug: String::new(),
            },
        );
    }

    let resolutions = node.path(&["resolutions", "resolution"]);
    for (i, resolution) in to_list(resolutions).into_iter().enumerate() {
        let price = resolution
            .get("priceWithVAT")
            .and_then(RawTree::text)
            .unwrap_or("0");
        contract.resolutions.insert(
            i,
            Resolution {
                price_with_vat: parse_amount(price).unwrap_or(0.0),
                adjudication_date: parse_date(
                    resolution.get("adjudicationDate").and_then(RawTree::text),
                ),
            },
        );
    }

    Ok(())
}

/// `{name: element text, code: @id}`.
fn coded(value: Option<&RawTree>) -> CodedValue {
    CodedValue::new(
        text_or_empty(value),
        value.and_then(|v| v.attr("id")).unwrap_or_default(),
    )
}

fn offerer(offer: &RawTree) -> Offerer {
    let sme = offer
        .get("pyme")
        .and_then(RawTree::text)
        .filter(|raw| !raw.trim().is_empty());
    Offerer {
        name: text_or_empty(offer.get("name")),
        cif: text_or_empty(offer.get("cif")),
        sme: sme.map(|raw| parse_bool(Some(raw))),
        date: parse_date(offer.get("registerDate").and_then(RawTree::text)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use procura_core::Language;

    use crate::decode::decode_text;
    use crate::normalize;

    fn contract(xml: &str) -> procura_core::Contract {
        let tree = decode_text(xml).unwrap();
        normalize(&tree, "42", 2021, Language::Es).unwrap().unwrap()
    }

    const FULL: &str = r#"<contractingAnnouncement>
  <contracting>
    <subject lang="es">Servicio de limpieza</subject>
    <contractingAuthority id="1234"><name>Ayuntamiento de Bilbao</name></contractingAuthority>
    <budgetWithVAT>1.216.511,05</budgetWithVAT>
    <processingStatus id="6">Resuelto</processingStatus>
    <contractingType id="2">Servicios</contractingType>
    <processing id="1">Ordinaria</processing>
    <adjudicationProcedure id="3">Abierto</adjudicationProcedure>
    <flags>
      <flag id="contrato_menor">No</flag>
      <flag id="sara">Sí</flag>
    </flags>
    <offersManagement>
      <numberOfOffers>2</numberOfOffers>
      <offerManagement>
        <name>Limpiezas Uno SL</name><cif>B11111111</cif>
        <pyme>Sí</pyme><registerDate>2021/03/02 10:00:00</registerDate>
      </offerManagement>
      <offerManagement>
        <name>Limpiezas Dos SA</name><cif>A22222222</cif>
      </offerManagement>
    </offersManagement>
    <formalizations>
      <formalization><id>B11111111</id><businessName>Limpiezas Uno SL</businessName></formalization>
    </formalizations>
    <resolutions>
      <resolution><priceWithVAT>6.824,37</priceWithVAT><adjudicationDate>15/04/2021</adjudicationDate></resolution>
    </resolutions>
  </contracting>
</contractingAnnouncement>"#;

    #[test]
    fn maps_every_field() {
        let c = contract(FULL);
        assert_eq!(c.title, "Servicio de limpieza");
        assert_eq!(c.authority.name, "Ayuntamiento de Bilbao");
        assert_eq!(c.authority.code, "1234");
        assert_eq!(c.budget, Some(1216511.05));
        assert_eq!(c.status.name, "Resuelto");
        assert_eq!(c.status.code, "6");
        assert_eq!(c.contract_type.name, "Servicios");
        assert_eq!(c.processing_type.code, "1");
        assert_eq!(c.adjudication_procedure.name, "Abierto");
        assert_eq!(c.minor_contract, Some(false));
        assert_eq!(c.offerer_count, procura_core::OffererCount::Count(2));

        assert_eq!(c.offerers.len(), 2);
        assert_eq!(c.offerers[0].sme, Some(true));
        assert_eq!(c.offerers[0].date, NaiveDate::from_ymd_opt(2021, 3, 2));
        assert_eq!(c.offerers[1].sme, None);
        assert_eq!(c.offerers[1].date, None);

        let winner = c.first_winner().unwrap();
        assert_eq!(winner.cif, "B11111111");
        assert_eq!(winner.name, "Limpiezas Uno SL");
        let resolution = c.first_resolution().unwrap();
        assert_eq!(resolution.price_with_vat, 6824.37);
        assert_eq!(resolution.adjudication_date, NaiveDate::from_ymd_opt(2021, 4, 15));
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let c = contract(
            "<contractingAnnouncement><contracting><flags><flag id=\"x\">1</flag></flags></contracting></contractingAnnouncement>",
        );
        assert_eq!(c.title, "");
        assert_eq!(c.authority.name, "");
        assert_eq!(c.budget, None);
        assert_eq!(c.status.name, "");
        assert_eq!(c.minor_contract, None);
        assert!(c.offerers.is_empty());
        assert!(c.winners.is_empty());
        assert!(c.resolutions.is_empty());
    }

    #[test]
    fn single_flag_is_read_as_list() {
        let c = contract(
            "<contractingAnnouncement><contracting><flags><flag id=\"contrato_menor\">Bai</flag></flags></contracting></contractingAnnouncement>",
        );
        assert_eq!(c.minor_contract, Some(true));
    }

    #[test]
    fn winners_and_resolutions_keep_document_order() {
        let c = contract(
            r#"<contractingAnnouncement><contracting>
                <flags><flag id="contrato_menor">No</flag></flags>
                <formalizations>
                  <formalization><id>A1</id><businessName>Primera</businessName></formalization>
                  <formalization><id>A2</id><businessName>Segunda</businessName></formalization>
                </formalizations>
                <resolutions>
                  <resolution><priceWithVAT>202.49</priceWithVAT></resolution>
                  <resolution><priceWithVAT>garbage</priceWithVAT></resolution>
                </resolutions>
            </contracting></contractingAnnouncement>"#,
        );
        assert_eq!(c.winners[&0].name, "Primera");
        assert_eq!(c.winners[&1].name, "Segunda");
        assert_eq!(c.resolutions[&0].price_with_vat, 202.49);
        assert_eq!(c.resolutions[&1].price_with_vat, 0.0);
        assert_eq!(c.resolutions[&0].adjudication_date, None);
    }

    #[test]
    fn missing_flags_block_is_a_structural_error() {
        let tree = decode_text(
            "<contractingAnnouncement><contracting><subject>x</subject></contracting></contractingAnnouncement>",
        )
        .unwrap();
        let err = normalize(&tree, "1", 2021, Language::Es).unwrap_err();
        assert!(err.to_string().contains("flags"));
    }

    #[test]
    fn authority_code_falls_back_to_id_attribute() {
        let c = contract(
            r#"<contractingAnnouncement><contracting>
                <contractingAuthority id="77"><name>Diputación</name></contractingAuthority>
                <flags><flag id="sara">No</flag></flags>
            </contracting></contractingAnnouncement>"#,
        );
        assert_eq!(c.authority.code, "77");

        let c = contract(
            r#"<contractingAnnouncement><contracting>
                <contractingAuthority id="77"><name>Diputación</name><code>88</code></contractingAuthority>
                <flags><flag id="sara">No</flag></flags>
            </contracting></contractingAnnouncement>"#,
        );
        assert_eq!(c.authority.code, "88");
    }
}

/// Arrow schema definitions for canonical contract records.
pub mod contracts {
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn utf8_list() -> DataType {
        DataType::List(Arc::new(Field::new("item", DataType::Utf8, true)))
    }

    /// One row per contract and language.
    ///
    /// Coded values are split into `<field>_name` / `<field>_code` columns;
    /// offerers and winners become parallel list columns in index order.
    pub fn contract_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("year", DataType::Int32, false),
            Field::new("language", DataType::Utf8, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("authority_name", DataType::Utf8, false),
            Field::new("authority_cif", DataType::Utf8, false),
            Field::new("authority_code", DataType::Utf8, false),
            Field::new("authority_slug", DataType::Utf8, false),
            Field::new("budget", DataType::Float64, true),
            Field::new("status_name", DataType::Utf8, false),
            Field::new("status_code", DataType::Utf8, false),
            Field::new("contract_type_name", DataType::Utf8, false),
            Field::new("contract_type_code", DataType::Utf8, false),
            Field::new("processing_type_name", DataType::Utf8, false),
            Field::new("processing_type_code", DataType::Utf8, false),
            Field::new("adjudication_procedure_name", DataType::Utf8, false),
            Field::new("adjudication_procedure_code", DataType::Utf8, false),
            Field::new("minor_contract", DataType::Boolean, true),
            Field::new("offerer_count", DataType::Utf8, false),
            Field::new("offerer_names", utf8_list(), false),
            Field::new("offerer_cifs", utf8_list(), false),
            Field::new("winner_names", utf8_list(), false),
            Field::new("winner_cifs", utf8_list(), false),
            Field::new("winner_slugs", utf8_list(), false),
            Field::new(
                "award_prices",
                DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
                false,
            ),
            Field::new("adjudication_date", DataType::Date32, true),
        ])
    }
}

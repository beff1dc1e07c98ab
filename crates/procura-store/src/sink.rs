use procura_core::Contract;

use crate::StoreError;

/// Destination for fully resolved contracts, one per id × language × year.
pub trait ContractSink {
    fn write(&mut self, contract: &Contract) -> Result<(), StoreError>;

    /// Flush anything buffered since the previous call.
    fn finish(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl<S: ContractSink + ?Sized> ContractSink for Box<S> {
    fn write(&mut self, contract: &Contract) -> Result<(), StoreError> {
        (**self).write(contract)
    }

    fn finish(&mut self) -> Result<(), StoreError> {
        (**self).finish()
    }
}

//! Mapeamento entre códigos de erro e a fronteira HTTP.
use crate::engine::error_catalog::EngineErrorCode;

/// Classe do erro na fronteira.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Authorization,
    NotFound,
    Conflict,
}

pub const fn classify(code: EngineErrorCode) -> ErrorClass {
    use EngineErrorCode::*;
    match code {
        UnauthorizedWallet | KycRequired => ErrorClass::Authorization,
        PoolNotFound | WexelNotFound | PriceNotFound => ErrorClass::NotFound,
        VersionConflict => ErrorClass::Conflict,
        InsufficientFunds
        | WexelAlreadyCollateralized
        | WexelNotCollateralized
        | BoostTargetExceeded
        | WexelNotMatured
        | InvalidPriceSource
        | PriceDeviationTooHigh
        | InvalidArgument
        | PoolInactive
        | Overflow => ErrorClass::Validation,
    }
}

/// 400 validação/regra de negócio, 403 autorização/KYC, 404 ausente, 409 conflito.
pub const fn http_status(code: EngineErrorCode) -> u16 {
    match classify(code) {
        ErrorClass::Validation => 400,
        ErrorClass::Authorization => 403,
        ErrorClass::NotFound => 404,
        ErrorClass::Conflict => 409,
    }
}

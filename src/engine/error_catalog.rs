//! Catálogo imutável de erros do motor de wexels.
use core::fmt;

/// Código de erro do motor.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum EngineErrorCode {
    /// Saldo ou valor insuficiente para a operação.
    InsufficientFunds,
    /// Pool inexistente.
    PoolNotFound,
    /// Wexel inexistente ou já resgatado.
    WexelNotFound,
    /// Wexel já está em colateral.
    WexelAlreadyCollateralized,
    /// Wexel não está em colateral.
    WexelNotCollateralized,
    /// Boost ultrapassaria o alvo do pool.
    BoostTargetExceeded,
    /// Resgate antes do vencimento.
    WexelNotMatured,
    /// Fonte de preço fora da whitelist.
    InvalidPriceSource,
    /// Desvio entre fontes acima do limite.
    PriceDeviationTooHigh,
    /// Carteira sem permissão sobre o wexel.
    UnauthorizedWallet,
    /// KYC obrigatório.
    KycRequired,
    /// Entrada malformada ou fora do contrato.
    InvalidArgument,
    /// Nenhuma cotação para o token/fonte.
    PriceNotFound,
    /// Pool desativado para novos depósitos.
    PoolInactive,
    /// Overflow ou underflow em cálculos numéricos.
    Overflow,
    /// Versão otimista divergente no commit.
    VersionConflict,
}

impl EngineErrorCode {
    /// Código textual estável do erro.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InsufficientFunds => "WXL-0001",
            Self::PoolNotFound => "WXL-0002",
            Self::WexelNotFound => "WXL-0003",
            Self::WexelAlreadyCollateralized => "WXL-0004",
            Self::WexelNotCollateralized => "WXL-0005",
            Self::BoostTargetExceeded => "WXL-0006",
            Self::WexelNotMatured => "WXL-0007",
            Self::InvalidPriceSource => "WXL-0008",
            Self::PriceDeviationTooHigh => "WXL-0009",
            Self::UnauthorizedWallet => "WXL-0010",
            Self::KycRequired => "WXL-0011",
            Self::InvalidArgument => "WXL-0012",
            Self::PriceNotFound => "WXL-0013",
            Self::PoolInactive => "WXL-0014",
            Self::Overflow => "WXL-0015",
            Self::VersionConflict => "WXL-0016",
        }
    }

    /// Título curto em português.
    pub const fn title(&self) -> &'static str {
        match self {
            Self::InsufficientFunds => "Fundos insuficientes",
            Self::PoolNotFound => "Pool não encontrado",
            Self::WexelNotFound => "Wexel não encontrado",
            Self::WexelAlreadyCollateralized => "Wexel já colateralizado",
            Self::WexelNotCollateralized => "Wexel não colateralizado",
            Self::BoostTargetExceeded => "Alvo de boost excedido",
            Self::WexelNotMatured => "Wexel não vencido",
            Self::InvalidPriceSource => "Fonte de preço inválida",
            Self::PriceDeviationTooHigh => "Desvio de preço alto",
            Self::UnauthorizedWallet => "Carteira não autorizada",
            Self::KycRequired => "KYC obrigatório",
            Self::InvalidArgument => "Argumento inválido",
            Self::PriceNotFound => "Preço não encontrado",
            Self::PoolInactive => "Pool inativo",
            Self::Overflow => "Overflow numérico",
            Self::VersionConflict => "Conflito de versão",
        }
    }

    /// Mensagem base em português (placeholders `{chave}` vêm do contexto).
    pub const fn message_pt(&self) -> &'static str {
        match self {
            Self::InsufficientFunds => "necessário {required}, disponível {available}",
            Self::PoolNotFound => "pool {pool_id} não existe",
            Self::WexelNotFound => "wexel {wexel_id} não existe",
            Self::WexelAlreadyCollateralized => "wexel {wexel_id} já está em colateral",
            Self::WexelNotCollateralized => "wexel {wexel_id} não está em colateral",
            Self::BoostTargetExceeded => "boost máximo adicional é {max_boost}",
            Self::WexelNotMatured => "wexel {wexel_id} vence em {maturity_date}",
            Self::InvalidPriceSource => "fonte {source} não suportada",
            Self::PriceDeviationTooHigh => "desvio {deviation_bps}bps acima de {max_deviation_bps}bps",
            Self::UnauthorizedWallet => "carteira {wallet} sem acesso",
            Self::KycRequired => "complete a verificação KYC para continuar",
            Self::InvalidArgument => "valor inválido para {campo}",
            Self::PriceNotFound => "sem cotação para {token_mint}",
            Self::PoolInactive => "pool {pool_id} não aceita depósitos",
            Self::Overflow => "overflow/underflow numérico",
            Self::VersionConflict => "wexel {wexel_id} alterado concorrentemente",
        }
    }

    /// Erros que a camada de I/O pode tentar de novo.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionConflict)
    }

    /// Retorna todas as variantes em ordem estável.
    pub fn all() -> &'static [EngineErrorCode] {
        const ALL: &[EngineErrorCode] = &[
            EngineErrorCode::InsufficientFunds,
            EngineErrorCode::PoolNotFound,
            EngineErrorCode::WexelNotFound,
            EngineErrorCode::WexelAlreadyCollateralized,
            EngineErrorCode::WexelNotCollateralized,
            EngineErrorCode::BoostTargetExceeded,
            EngineErrorCode::WexelNotMatured,
            EngineErrorCode::InvalidPriceSource,
            EngineErrorCode::PriceDeviationTooHigh,
            EngineErrorCode::UnauthorizedWallet,
            EngineErrorCode::KycRequired,
            EngineErrorCode::InvalidArgument,
            EngineErrorCode::PriceNotFound,
            EngineErrorCode::PoolInactive,
            EngineErrorCode::Overflow,
            EngineErrorCode::VersionConflict,
        ];
        ALL
    }
}

impl fmt::Display for EngineErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Mensagem padrão na localidade ativa (pt-BR).
pub fn default_locale_message(code: EngineErrorCode) -> &'static str {
    code.message_pt()
}

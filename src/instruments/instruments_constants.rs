/// Lot size written when the form value is blank, zero, negative or unparseable.
pub const DEFAULT_LOT: i64 = 1;

/// Broker whose enablement requires the external-venue identifier (`figi`).
pub const FIGI_BROKER: &str = "tinkoff";

/// Document fields shared by stock, bond and future instruments.
pub const LISTED_FIELDS: &[&str] = &[
    "lot",
    "currency",
    "spbexSymbol",
    "isin",
    "figi",
    "classCode",
    "sector",
];

/// Document fields written only for bonds.
pub const BOND_FIELDS: &[&str] = &[
    "amortizationFlag",
    "floatingCouponFlag",
    "perpetualFlag",
    "subordinatedFlag",
    "issueKind",
    "initialNominal",
    "nominal",
    "maturityDate",
    "couponQuantityPerYear",
];

/// Document fields written only for futures.
pub const FUTURE_FIELDS: &[&str] = &["expirationDate", "basicAsset"];

/// Document fields written only for cryptocurrencies.
pub const CRYPTO_FIELDS: &[&str] = &[
    "minQuantityIncrement",
    "minNotional",
    "baseCryptoAsset",
    "quoteCryptoAsset",
];

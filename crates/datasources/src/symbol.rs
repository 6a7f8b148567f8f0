use dexter_core::{Error, Result};

/// Market a symbol trades on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Market {
    ShanghaiA,
    ShenzhenA,
    HongKong,
}

impl Market {
    pub fn is_a_share(self) -> bool {
        matches!(self, Market::ShanghaiA | Market::ShenzhenA)
    }

    pub fn currency(self) -> &'static str {
        match self {
            Market::HongKong => "HKD",
            _ => "CNY",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Market::ShanghaiA | Market::ShenzhenA => "A股",
            Market::HongKong => "港股",
        }
    }
}

/// A parsed stock symbol: the bare code plus its market.
///
/// Accepted inputs: `600519.SH`, `000001.SZ`, `00700.HK`, bare 6-digit
/// A-share codes (market inferred from the code prefix) and bare 5-digit
/// Hong Kong codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockSymbol {
    pub code: String,
    pub market: Market,
}

impl StockSymbol {
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim().to_uppercase();

        if let Some(code) = s.strip_suffix(".SH").or_else(|| s.strip_suffix(".SS")) {
            return Self::checked(code, Market::ShanghaiA);
        }
        if let Some(code) = s.strip_suffix(".SZ") {
            return Self::checked(code, Market::ShenzhenA);
        }
        if let Some(code) = s.strip_suffix(".HK") {
            return Self::checked(code, Market::HongKong);
        }

        if s.len() == 6 && s.chars().all(|c| c.is_ascii_digit()) {
            // 6xx: Shanghai main board / STAR, 0xx and 3xx: Shenzhen
            let market = match &s[..1] {
                "6" => Market::ShanghaiA,
                "0" | "3" => Market::ShenzhenA,
                _ => {
                    return Err(Error::DataSource(format!(
                        "Unrecognized A-share code: {}",
                        input
                    )))
                }
            };
            return Self::checked(&s, market);
        }
        if s.len() == 5 && s.chars().all(|c| c.is_ascii_digit()) {
            return Self::checked(&s, Market::HongKong);
        }

        Err(Error::DataSource(format!("Invalid stock symbol: {}", input)))
    }

    fn checked(code: &str, market: Market) -> Result<Self> {
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::DataSource(format!("Invalid stock code: {}", code)));
        }
        Ok(Self {
            code: code.to_string(),
            market,
        })
    }

    /// Canonical form with the market suffix, `600519.SH` / `00700.HK`.
    pub fn canonical(&self) -> String {
        let suffix = match self.market {
            Market::ShanghaiA => "SH",
            Market::ShenzhenA => "SZ",
            Market::HongKong => "HK",
        };
        format!("{}.{}", self.code, suffix)
    }

    /// 东方财富 secid: `1.600519` (沪), `0.000001` (深), `116.00700` (港).
    pub fn eastmoney_secid(&self) -> String {
        let prefix = match self.market {
            Market::ShanghaiA => "1",
            Market::ShenzhenA => "0",
            Market::HongKong => "116",
        };
        format!("{}.{}", prefix, self.code)
    }

    /// 腾讯行情 code: `sh600519`, `sz000001`, `hk00700`.
    pub fn tencent_code(&self) -> String {
        let prefix = match self.market {
            Market::ShanghaiA => "sh",
            Market::ShenzhenA => "sz",
            Market::HongKong => "hk",
        };
        format!("{}{}", prefix, self.code)
    }

    /// Yahoo Finance ticker. HK codes are 4 digits there (`0700.HK`).
    pub fn yahoo_ticker(&self) -> String {
        match self.market {
            Market::ShanghaiA => format!("{}.SS", self.code),
            Market::ShenzhenA => format!("{}.SZ", self.code),
            Market::HongKong => {
                let code = if self.code.len() == 5 && self.code.starts_with('0') {
                    &self.code[1..]
                } else {
                    self.code.as_str()
                };
                format!("{}.HK", code)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_suffix() {
        let s = StockSymbol::parse("600519.SH").unwrap();
        assert_eq!(s.code, "600519");
        assert_eq!(s.market, Market::ShanghaiA);

        let s = StockSymbol::parse("000001.sz").unwrap();
        assert_eq!(s.market, Market::ShenzhenA);

        let s = StockSymbol::parse("00700.HK").unwrap();
        assert_eq!(s.market, Market::HongKong);
        assert_eq!(s.canonical(), "00700.HK");
    }

    #[test]
    fn test_parse_bare_codes() {
        assert_eq!(
            StockSymbol::parse("600036").unwrap().market,
            Market::ShanghaiA
        );
        assert_eq!(
            StockSymbol::parse("300750").unwrap().market,
            Market::ShenzhenA
        );
        assert_eq!(
            StockSymbol::parse("00941").unwrap().market,
            Market::HongKong
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(StockSymbol::parse("AAPL").is_err());
        assert!(StockSymbol::parse("").is_err());
        assert!(StockSymbol::parse("12345678").is_err());
    }

    #[test]
    fn test_source_specific_codes() {
        let moutai = StockSymbol::parse("600519.SH").unwrap();
        assert_eq!(moutai.eastmoney_secid(), "1.600519");
        assert_eq!(moutai.tencent_code(), "sh600519");
        assert_eq!(moutai.yahoo_ticker(), "600519.SS");

        let tencent = StockSymbol::parse("00700.HK").unwrap();
        assert_eq!(tencent.eastmoney_secid(), "116.00700");
        assert_eq!(tencent.tencent_code(), "hk00700");
        assert_eq!(tencent.yahoo_ticker(), "0700.HK");
    }

    #[test]
    fn test_market_attributes() {
        assert_eq!(Market::HongKong.currency(), "HKD");
        assert_eq!(Market::ShanghaiA.currency(), "CNY");
        assert!(Market::ShenzhenA.is_a_share());
        assert!(!Market::HongKong.is_a_share());
    }
}

//! Static lookup tables for the World Bank provider
//!
//! Friendly indicator names map to World Bank indicator codes; country
//! ISO3/ISO2 codes map to the ISO3 code the API expects.

use crate::domain::{DataFrequency, IndicatorCategory};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorInfo {
    /// Friendly name used in requests (e.g., "gdp")
    pub name: &'static str,
    /// World Bank indicator code (e.g., "NY.GDP.MKTP.CD")
    pub code: &'static str,
    pub category: IndicatorCategory,
    pub frequency: DataFrequency,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountryInfo {
    pub iso3: &'static str,
    pub iso2: &'static str,
    pub name: &'static str,
}

const fn annual(
    name: &'static str,
    code: &'static str,
    category: IndicatorCategory,
    description: &'static str,
) -> IndicatorInfo {
    IndicatorInfo {
        name,
        code,
        category,
        frequency: DataFrequency::Annual,
        description,
    }
}

const fn country(iso3: &'static str, iso2: &'static str, name: &'static str) -> CountryInfo {
    CountryInfo { iso3, iso2, name }
}

use IndicatorCategory::*;

pub const INDICATORS: &[IndicatorInfo] = &[
    // Economic
    annual("gdp", "NY.GDP.MKTP.CD", Economic, "GDP (current US$)"),
    annual("gdp_per_capita", "NY.GDP.PCAP.CD", Economic, "GDP per capita (current US$)"),
    annual("gdp_growth", "NY.GDP.MKTP.KD.ZG", Economic, "GDP growth (annual %)"),
    annual("inflation", "FP.CPI.TOTL.ZG", Economic, "Inflation, consumer prices (annual %)"),
    annual("unemployment", "SL.UEM.TOTL.ZS", Economic, "Unemployment (% of total labor force)"),
    annual("exports", "NE.EXP.GNFS.ZS", Economic, "Exports of goods and services (% of GDP)"),
    annual("imports", "NE.IMP.GNFS.ZS", Economic, "Imports of goods and services (% of GDP)"),
    annual("fdi_inflows", "BX.KLT.DINV.WD.GD.ZS", Economic, "Foreign direct investment, net inflows (% of GDP)"),
    annual("government_debt", "GC.DOD.TOTL.GD.ZS", Economic, "Central government debt (% of GDP)"),
    // Social
    annual("population", "SP.POP.TOTL", Social, "Population, total"),
    annual("population_growth", "SP.POP.GROW", Social, "Population growth (annual %)"),
    annual("urban_population", "SP.URB.TOTL.IN.ZS", Social, "Urban population (% of total)"),
    annual("poverty_rate", "SI.POV.DDAY", Social, "Poverty headcount ratio at $2.15 a day (%)"),
    annual("gini", "SI.POV.GINI", Social, "Gini index"),
    // Health
    annual("life_expectancy", "SP.DYN.LE00.IN", Health, "Life expectancy at birth (years)"),
    annual("infant_mortality", "SP.DYN.IMRT.IN", Health, "Infant mortality rate (per 1,000 live births)"),
    annual("health_expenditure", "SH.XPD.CHEX.GD.ZS", Health, "Current health expenditure (% of GDP)"),
    // Education
    annual("literacy_rate", "SE.ADT.LITR.ZS", Education, "Literacy rate, adult total (%)"),
    annual("secondary_enrollment", "SE.SEC.ENRR", Education, "School enrollment, secondary (% gross)"),
    annual("education_expenditure", "SE.XPD.TOTL.GD.ZS", Education, "Government expenditure on education (% of GDP)"),
    // Environmental
    annual("co2_emissions", "EN.ATM.CO2E.PC", Environmental, "CO2 emissions (metric tons per capita)"),
    annual("forest_area", "AG.LND.FRST.ZS", Environmental, "Forest area (% of land area)"),
    annual("renewable_energy", "EG.FEC.RNEW.ZS", Environmental, "Renewable energy consumption (% of total)"),
    // Infrastructure
    annual("electricity_access", "EG.ELC.ACCS.ZS", Infrastructure, "Access to electricity (% of population)"),
    annual("internet_users", "IT.NET.USER.ZS", Infrastructure, "Individuals using the Internet (% of population)"),
    annual("mobile_subscriptions", "IT.CEL.SETS.P2", Infrastructure, "Mobile cellular subscriptions (per 100 people)"),
    // Governance
    annual("control_of_corruption", "CC.EST", Governance, "Control of Corruption: Estimate"),
    annual("rule_of_law", "RL.EST", Governance, "Rule of Law: Estimate"),
    annual("government_effectiveness", "GE.EST", Governance, "Government Effectiveness: Estimate"),
];

pub const COUNTRIES: &[CountryInfo] = &[
    country("WLD", "1W", "World"),
    country("USA", "US", "United States"),
    country("CAN", "CA", "Canada"),
    country("MEX", "MX", "Mexico"),
    country("BRA", "BR", "Brazil"),
    country("ARG", "AR", "Argentina"),
    country("CHL", "CL", "Chile"),
    country("COL", "CO", "Colombia"),
    country("PER", "PE", "Peru"),
    country("GBR", "GB", "United Kingdom"),
    country("FRA", "FR", "France"),
    country("DEU", "DE", "Germany"),
    country("ITA", "IT", "Italy"),
    country("ESP", "ES", "Spain"),
    country("NLD", "NL", "Netherlands"),
    country("SWE", "SE", "Sweden"),
    country("NOR", "NO", "Norway"),
    country("POL", "PL", "Poland"),
    country("CHE", "CH", "Switzerland"),
    country("RUS", "RU", "Russian Federation"),
    country("TUR", "TR", "Turkiye"),
    country("CHN", "CN", "China"),
    country("JPN", "JP", "Japan"),
    country("KOR", "KR", "Korea, Rep."),
    country("IND", "IN", "India"),
    country("IDN", "ID", "Indonesia"),
    country("PAK", "PK", "Pakistan"),
    country("BGD", "BD", "Bangladesh"),
    country("VNM", "VN", "Viet Nam"),
    country("THA", "TH", "Thailand"),
    country("PHL", "PH", "Philippines"),
    country("MYS", "MY", "Malaysia"),
    country("SGP", "SG", "Singapore"),
    country("AUS", "AU", "Australia"),
    country("NZL", "NZ", "New Zealand"),
    country("ZAF", "ZA", "South Africa"),
    country("NGA", "NG", "Nigeria"),
    country("EGY", "EG", "Egypt, Arab Rep."),
    country("KEN", "KE", "Kenya"),
    country("ETH", "ET", "Ethiopia"),
    country("SAU", "SA", "Saudi Arabia"),
    country("ARE", "AE", "United Arab Emirates"),
    country("ISR", "IL", "Israel"),
];

/// Look up an indicator by friendly name or raw World Bank code (case-insensitive)
pub fn indicator(name_or_code: &str) -> Option<&'static IndicatorInfo> {
    let wanted = name_or_code.trim();
    INDICATORS
        .iter()
        .find(|i| i.name.eq_ignore_ascii_case(wanted) || i.code.eq_ignore_ascii_case(wanted))
}

/// Look up a country by ISO3 or ISO2 code (case-insensitive)
pub fn country_info(code: &str) -> Option<&'static CountryInfo> {
    let wanted = code.trim();
    COUNTRIES
        .iter()
        .find(|c| c.iso3.eq_ignore_ascii_case(wanted) || c.iso2.eq_ignore_ascii_case(wanted))
}

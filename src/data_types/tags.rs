//! Provider vocabularies for allergens, meal types and meat types.
//!
//! Both providers ship these as free-text strings in their own wording (and
//! language), so every mapper is total: anything unrecognized ends up as
//! `Allergen::Other` instead of being dropped. Losing an allergen silently
//! would be a correctness bug, not a cosmetic one.

/// The 15 known allergen categories plus a lossless fallback.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Allergen {
    Gluten,
    Crustaceans,
    Eggs,
    Fish,
    Peanuts,
    Soya,
    Lactose,
    Nuts,
    Celery,
    Mustard,
    Sesame,
    SulphurDioxide,
    Lupin,
    Molluscs,
    Wheat,
    Other(String),
}

impl Allergen {
    pub fn from_eth(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "gluten wheat" => Self::Gluten,
            "crustaceans" | "krebstiere" => Self::Crustaceans,
            "eggs" => Self::Eggs,
            "fish" => Self::Fish,
            "peanuts" => Self::Peanuts,
            "soya" => Self::Soya,
            "lactose" | "milk" => Self::Lactose,
            "nuts" => Self::Nuts,
            "celery" => Self::Celery,
            "mustard" => Self::Mustard,
            "sesame" => Self::Sesame,
            "sulfites" => Self::SulphurDioxide,
            "lupin" => Self::Lupin,
            "molluscs" => Self::Molluscs,
            _ => Self::Other(raw.to_string()),
        }
    }

    /// `None` for the explicit "free of declarable allergens" marker.
    pub fn from_uzh(raw: &str) -> Option<Self> {
        match raw.to_uppercase().as_str() {
            "FREI_VON_DEKLARAT_PFLICHTIGEN_ALLERGENEN" => None,
            "GLUTEN" => Some(Self::Gluten),
            "SOJA" => Some(Self::Soya),
            "EI" => Some(Self::Eggs),
            "FISCH" => Some(Self::Fish),
            "ERDNUSS" => Some(Self::Peanuts),
            "KREBSTIERE" => Some(Self::Crustaceans),
            "MILCH_LAKTOSE" => Some(Self::Lactose),
            "SCHALENFRUECHTE" | "CASHEW" | "MANDEL" => Some(Self::Nuts),
            "SELLERIE" => Some(Self::Celery),
            "SENF" => Some(Self::Mustard),
            "SESAM" => Some(Self::Sesame),
            "SULPHURDIOXIDE" | "SCHWFELDIOXID_SULFITE" => Some(Self::SulphurDioxide),
            "WEIZEN" => Some(Self::Wheat),
            _ => Some(Self::Other(raw.to_string())),
        }
    }

    /// Parses the canonical label back into an allergen (used for user
    /// preference input); anything else becomes `Other` unchanged.
    pub fn from_label(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "gluten" => Self::Gluten,
            "crustaceans" => Self::Crustaceans,
            "eggs" => Self::Eggs,
            "fish" => Self::Fish,
            "peanuts" => Self::Peanuts,
            "soya" => Self::Soya,
            "lactose" => Self::Lactose,
            "nuts" => Self::Nuts,
            "celery" => Self::Celery,
            "mustard" => Self::Mustard,
            "sesame" => Self::Sesame,
            "sulphurdioxide" => Self::SulphurDioxide,
            "lupin" => Self::Lupin,
            "molluscs" => Self::Molluscs,
            "wheat" => Self::Wheat,
            _ => Self::Other(label.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Gluten => "gluten",
            Self::Crustaceans => "crustaceans",
            Self::Eggs => "eggs",
            Self::Fish => "fish",
            Self::Peanuts => "peanuts",
            Self::Soya => "soya",
            Self::Lactose => "lactose",
            Self::Nuts => "nuts",
            Self::Celery => "celery",
            Self::Mustard => "mustard",
            Self::Sesame => "sesame",
            Self::SulphurDioxide => "sulphurdioxide",
            Self::Lupin => "lupin",
            Self::Molluscs => "molluscs",
            Self::Wheat => "wheat",
            Self::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MealType {
    Vegan,
    Vegetarian,
    Fish,
}

impl MealType {
    pub fn from_eth(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "vegan" => Some(Self::Vegan),
            "vegetarian" => Some(Self::Vegetarian),
            "fish" => Some(Self::Fish),
            _ => None,
        }
    }

    pub fn from_uzh(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "vegan" => Some(Self::Vegan),
            "vegetarisch" => Some(Self::Vegetarian),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Vegan => "vegan",
            Self::Vegetarian => "vegetarian",
            Self::Fish => "fish",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeatType {
    Beef,
    Chicken,
    Duck,
    Veal,
    Turkey,
    Pork,
}

impl MeatType {
    // only the ETH answer carries meat types
    pub fn from_eth(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "beef" => Some(Self::Beef),
            "chicken" => Some(Self::Chicken),
            "duck" => Some(Self::Duck),
            "veal" => Some(Self::Veal),
            "turkey" => Some(Self::Turkey),
            "pork" => Some(Self::Pork),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Beef => "beef",
            Self::Chicken => "chicken",
            Self::Duck => "duck",
            Self::Veal => "veal",
            Self::Turkey => "turkey",
            Self::Pork => "pork",
        }
    }
}

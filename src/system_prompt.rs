use crate::emotion::{ConversationMode, EmotionalState};
use crate::profile::{UserProfile, DEFAULT_TONE};
use crate::prompts::{
    BASE_GUARDRAILS, CLOSING_REMINDER, GEN_ALPHA_STYLE, GEN_Z_STYLE,
    SLANG_REMINDER, SUPPORT_IDENTITY,
};
use regex::Regex;
use std::sync::OnceLock;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Age group used to pick the assistant's register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    Alpha,
    Z,
    Adult,
    Senior,
}

fn first_number(text: &str) -> Option<u32> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let re = NUMBER.get_or_init(|| Regex::new(r"\d+").expect("valid regex"));
    re.find(text).and_then(|m| m.as_str().parse().ok())
}

impl Generation {
    /// Classifies a free-text age description such as `"~12 años (niño)"`.
    pub fn classify(age_range: Option<&str>) -> Self {
        let Some(age) = age_range else {
            return Generation::Adult;
        };
        let lower = age.to_lowercase();
        let number = first_number(&lower);

        if lower.contains("niño")
            || lower.contains("preadolescente")
            || number.is_some_and(|n| n <= 13)
        {
            Generation::Alpha
        } else if lower.contains("adolescente")
            || number.is_some_and(|n| (14..=20).contains(&n))
        {
            Generation::Z
        } else if lower.contains("senior") || number.is_some_and(|n| n >= 70) {
            Generation::Senior
        } else {
            Generation::Adult
        }
    }

    pub fn is_young(self) -> bool {
        matches!(self, Generation::Alpha | Generation::Z)
    }
}

fn language_style(age_range: Option<&str>) -> &'static str {
    if age_range.is_none() {
        return "un español (natural, amigable)";
    }
    match Generation::classify(age_range) {
        Generation::Alpha => {
            "un colega de tu edad de la Generación Alfa española (usa jerga viral 2024-2025: literal, en plan, rizz, PEC, cringe, chetado, bro)"
        }
        Generation::Z => {
            "un colega de tu edad de la Generación Z española (usa jerga natural 2024-2025: en plan, literal, me renta, PEC, cringe, crush, tete, bro)"
        }
        Generation::Senior => {
            "un adulto mayor español (cálido, experimentado - sin emojis ni jerga)"
        }
        Generation::Adult => {
            "un adulto español (natural, equilibrado - sin emojis ni jerga juvenil)"
        }
    }
}

fn identity_section(profile: &UserProfile, mode: ConversationMode) -> String {
    if mode.is_support() {
        return SUPPORT_IDENTITY.to_string();
    }

    let age_range = profile.age_range.as_deref();
    let age = age_range.unwrap_or("adulto");
    let first_interest = profile.interests.first();

    let mut peer = match Generation::classify(age_range) {
        Generation::Alpha => "un amigo de tu edad".to_string(),
        Generation::Z => "un colega adolescente".to_string(),
        _ => match &profile.profession {
            Some(profession) => {
                format!("alguien como tú, que trabaja en {}", profession)
            }
            None => "alguien de tu edad".to_string(),
        },
    };
    if let Some(interest) = first_interest {
        let link = match Generation::classify(age_range) {
            Generation::Alpha => "al que le encanta",
            Generation::Z => "experto en",
            _ if profile.profession.is_some() => "y le apasiona",
            _ => "con pasión por",
        };
        peer.push_str(&format!(" {} {}", link, interest));
    }

    let shared = if profile.interests.is_empty() {
        "varios temas".to_string()
    } else {
        profile
            .interests
            .iter()
            .take(3)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "IDENTIDAD Y ROL:\n\
         Eres {peer}.\n\
         Compartes intereses y hablas como {style}.\n\
         \n\
         TU PERSONALIDAD:\n\
         - Edad: Similar a {age}\n\
         - Intereses compartidos: {shared}\n\
         - Rol: Amigo/igual que además es experto en {expert}",
        peer = peer,
        style = language_style(age_range),
        age = age,
        shared = shared,
        expert = first_interest.map(String::as_str).unwrap_or("muchos temas"),
    )
}

fn push_list(parts: &mut Vec<String>, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    parts.push(format!("\n{}", heading));
    parts.extend(items.iter().map(|item| format!("   • {}", item)));
}

fn profile_summary(profile: &UserProfile) -> String {
    let mut parts = vec![
        "PERFIL COMPLETO DEL USUARIO:".to_string(),
        RULE.to_string(),
    ];

    let scalars = [
        ("📅 Edad", &profile.age_range),
        ("👤 Género", &profile.gender),
        ("💼 Profesión", &profile.profession),
        ("🎓 Estudios", &profile.education),
    ];
    for (label, value) in scalars {
        if let Some(value) = value {
            parts.push(format!("{}: {}", label, value));
        }
    }

    push_list(&mut parts, "🎮 INTERESES Y PASIONES:", &profile.interests);

    let politics = &profile.political_stance;
    if let Some(spectrum) = &politics.spectrum {
        parts.push("\n🏛️ POSTURA POLÍTICA:".to_string());
        parts.push(format!(
            "   Tendencia: {} (intensidad: {})",
            spectrum,
            politics.intensity.as_deref().unwrap_or("moderado")
        ));
        match politics.approach.as_deref() {
            Some("align") => parts
                .push("   → Muestra empatía con su perspectiva política".to_string()),
            Some("avoid") => parts.push(
                "   → EVITA temas políticos salvo que él los mencione".to_string(),
            ),
            _ => {}
        }
    }

    let religion = &profile.religion;
    if let Some(faith) = &religion.faith {
        parts.push("\n⛪ RELIGIÓN:".to_string());
        parts.push(format!(
            "   Fe: {} ({})",
            faith,
            religion.intensity.as_deref().unwrap_or("moderado")
        ));
        match religion.approach.as_deref() {
            Some("engage") => parts
                .push("   → Puedes usar referencias apropiadas a su fe".to_string()),
            Some("respectful") => {
                parts.push("   → Respeta profundamente sus creencias".to_string())
            }
            _ => {}
        }
    }

    push_list(&mut parts, "📝 HECHOS IMPORTANTES:", &profile.important_facts);
    push_list(
        &mut parts,
        "⚠️ TEMAS SENSIBLES (tratar con cuidado):",
        &profile.sensitive_topics,
    );
    push_list(&mut parts, "💡 NECESIDADES DEL USUARIO:", &profile.needs);

    parts.push(RULE.to_string());
    parts.join("\n")
}

fn behavior_instructions(profile: &UserProfile) -> String {
    let mut lines = vec!["INSTRUCCIONES DE COMPORTAMIENTO:".to_string()];

    match Generation::classify(profile.age_range.as_deref()) {
        Generation::Alpha => lines.push(GEN_ALPHA_STYLE.to_string()),
        Generation::Z => lines.push(GEN_Z_STYLE.to_string()),
        Generation::Adult | Generation::Senior => {
            let tone = profile.tone_preference.as_deref().unwrap_or(DEFAULT_TONE);
            lines.push(format!("- Tono: {}", tone));
            lines.push("- NO uses emojis".to_string());
            lines.push("- Lenguaje estándar, profesional pero cercano".to_string());
        }
    }

    if let Some(first) = profile.interests.first() {
        lines.push("\n🎯 INTERESES COMPARTIDOS:".to_string());
        lines.push(format!(
            "- Habla con conocimiento sobre: {}",
            profile.interests.join(", ")
        ));
        lines.push(format!("- Menciona o pregunta por: {} de forma natural", first));
    }

    if let Some(fact) = profile.important_facts.first() {
        lines.push("\n📝 CONTEXTO:".to_string());
        lines.push(format!("- Recuerda: {}", fact));
    }

    lines.join("\n")
}

fn guardrails(emotional_state: Option<&EmotionalState>) -> String {
    let mut text = BASE_GUARDRAILS.to_string();
    if let Some(state) = emotional_state.filter(|s| s.needs_high_support()) {
        if !state.detected_concerns.is_empty() {
            let concerns = state
                .detected_concerns
                .iter()
                .take(2)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            text.push_str(&format!("\n\n🚨 ALERTA ACTUAL: {}", concerns));
            text.push_str(
                "\n   → Mantén tono de apoyo y considera sugerir ayuda profesional",
            );
        }
    }
    text
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissingInfo {
    Name,
    Age,
    AmbiguousGender,
    SchoolGrade,
    KidInterests,
    Profession,
    FamilyStatusFemale,
    AdultInterests,
}

fn missing_info(profile: &UserProfile) -> Vec<MissingInfo> {
    let mut missing = Vec::new();
    let gender = profile.gender.as_deref();

    if profile.name.is_none() {
        missing.push(MissingInfo::Name);
    }
    if profile.age_range.is_none() {
        missing.push(MissingInfo::Age);
    }
    if gender == Some("ambiguo") {
        missing.push(MissingInfo::AmbiguousGender);
    }

    let generation = Generation::classify(profile.age_range.as_deref());
    let known_adult = profile.age_range.is_some()
        && matches!(generation, Generation::Adult | Generation::Senior);

    if profile.age_range.is_some() && generation == Generation::Alpha {
        if profile.profession.is_none() {
            missing.push(MissingInfo::SchoolGrade);
        }
        if profile.interests.len() < 2 {
            missing.push(MissingInfo::KidInterests);
        }
    } else if matches!(gender, Some("femenino") | Some("masculino")) || known_adult {
        // Occupation questions already double as gender hints.
        if profile.profession.is_none()
            && !missing.contains(&MissingInfo::AmbiguousGender)
        {
            missing.push(MissingInfo::Profession);
        }
        if gender == Some("femenino") && missing.len() < 3 {
            missing.push(MissingInfo::FamilyStatusFemale);
        }
        if profile.interests.len() < 2 {
            missing.push(MissingInfo::AdultInterests);
        }
    }

    missing
}

fn question_lines(info: MissingInfo) -> &'static [&'static str] {
    match info {
        MissingInfo::Name => &[
            "- Pregunta su nombre de forma natural (ej: 'Por cierto, ¿cómo te llamas?')",
        ],
        MissingInfo::Age => {
            &["- Intenta averiguar su edad aproximada de forma indirecta"]
        }
        MissingInfo::AmbiguousGender => &[
            "- PRIORIDAD: Pregunta su ocupación para deducir género:",
            "  * '¿A qué te dedicas?' o '¿En qué trabajas?' o '¿Qué estudias?'",
            "  * Forma FEMENINA confirma 100% (ingeniera, médica, profesora)",
            "  * Forma MASCULINA no confirma (puede ser mujer usando forma masculina)",
            "  * Si usa forma masculina con nombre ambiguo, haz pregunta de contexto:",
            "    - '¿Tienes hijos?' o '¿Estás casado/a?' (respuesta revelará género)",
            "    - Pregunta por familia o situación personal",
            "  NUNCA preguntes el género directamente",
        ],
        MissingInfo::SchoolGrade => &[
            "- Pregunta: '¿A qué curso vas?' o '¿Cuál es tu asignatura favorita?'",
        ],
        MissingInfo::KidInterests => &[
            "- Pregunta: '¿Qué otras cosas te gusta hacer?' o '¿Juegas a otros juegos?'",
        ],
        MissingInfo::Profession => {
            &["- Pregunta: '¿A qué te dedicas?' o '¿En qué trabajas?'"]
        }
        MissingInfo::FamilyStatusFemale => &[
            "- Pregunta: '¿Tienes hijos?' o '¿Estás casada?' (natural entre mujeres)",
            "- Si tiene hijos, pregunta: '¿Qué edad tienen?'",
        ],
        MissingInfo::AdultInterests => &[
            "- Pregunta: '¿Qué te gusta hacer en tu tiempo libre?' o '¿Tienes alguna afición?'",
        ],
    }
}

/// Instructions nudging the assistant to fill gaps in the profile; empty
/// when nothing is missing.
pub fn proactive_questions(profile: &UserProfile) -> String {
    let missing = missing_info(profile);
    if missing.is_empty() {
        return String::new();
    }

    let mut lines = vec![
        "\nPREGUNTAS PROACTIVAS (haz 1-2 de estas de forma natural en la conversación):"
            .to_string(),
    ];
    for info in missing {
        lines.extend(question_lines(info).iter().map(|l| l.to_string()));
    }
    lines.push(
        "\nIMPORTANTE: Integra estas preguntas de forma NATURAL en la conversación, NO todas a la vez."
            .to_string(),
    );
    lines.join("\n")
}

/// Builds the adaptive system prompt for a user.
pub fn generate_system_prompt(
    profile: &UserProfile,
    emotional_state: Option<&EmotionalState>,
) -> String {
    let mode = emotional_state
        .map(EmotionalState::mode)
        .unwrap_or(ConversationMode::Normal);

    let slang = if Generation::classify(profile.age_range.as_deref()).is_young() {
        SLANG_REMINDER
    } else {
        ""
    };

    format!(
        "{identity}\n{slang}\n{summary}\n\n{behavior}\n\n{guardrails}\n\n{questions}\n{slang}\n{closing}",
        identity = identity_section(profile, mode),
        slang = slang,
        summary = profile_summary(profile),
        behavior = behavior_instructions(profile),
        guardrails = guardrails(emotional_state),
        questions = proactive_questions(profile),
        closing = CLOSING_REMINDER,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{PoliticalStance, Religion};

    fn profile_with_age(age: &str) -> UserProfile {
        UserProfile {
            age_range: Some(age.to_string()),
            ..UserProfile::empty()
        }
    }

    #[test]
    fn classifies_generations_from_age_text() {
        let cases = [
            ("~10 años (niño)", Generation::Alpha),
            ("~10-17 años (preadolescente/adolescente)", Generation::Alpha),
            ("12", Generation::Alpha),
            ("~16 años (adolescente)", Generation::Z),
            ("18 años", Generation::Z),
            ("~45 años (adulto)", Generation::Adult),
            ("senior", Generation::Senior),
            ("~78 años", Generation::Senior),
            ("adulto joven", Generation::Adult),
        ];
        for (age, expected) in cases {
            assert_eq!(Generation::classify(Some(age)), expected, "{}", age);
        }
        assert_eq!(Generation::classify(None), Generation::Adult);
        assert!(Generation::Z.is_young());
        assert!(!Generation::Senior.is_young());
    }

    #[test]
    fn eighteen_is_not_read_as_eight() {
        // A substring check for "8" would put this user among children.
        assert_eq!(Generation::classify(Some("~28 años")), Generation::Adult);
        assert_eq!(Generation::classify(Some("18")), Generation::Z);
    }

    #[test]
    fn young_users_get_slang_reminder_twice() {
        let prompt = generate_system_prompt(&profile_with_age("~12 años"), None);
        assert_eq!(prompt.matches("ADVERTENCIA CRÍTICA").count(), 2);
        assert!(prompt.contains("ESTILO GENERACIÓN ALFA"));
        assert!(prompt.contains("Eres un amigo de tu edad."));

        let prompt = generate_system_prompt(&profile_with_age("~45 años"), None);
        assert!(!prompt.contains("ADVERTENCIA CRÍTICA"));
        assert!(prompt.contains("- NO uses emojis"));
        assert!(prompt.contains("- Tono: amigable y natural"));
    }

    #[test]
    fn identity_reflects_profession_and_interest() {
        let profile = UserProfile {
            age_range: Some("~40 años (adulto)".to_string()),
            profession: Some("enfermería".to_string()),
            interests: vec!["senderismo".to_string(), "cocina".to_string()],
            ..UserProfile::empty()
        };
        let prompt = generate_system_prompt(&profile, None);
        assert!(prompt.starts_with(
            "IDENTIDAD Y ROL:\nEres alguien como tú, que trabaja en enfermería y le apasiona senderismo."
        ));
        assert!(prompt.contains("- Intereses compartidos: senderismo, cocina"));
        assert!(prompt.contains("un adulto español (natural, equilibrado"));
        assert!(prompt.contains("- Menciona o pregunta por: senderismo de forma natural"));
    }

    #[test]
    fn unknown_age_uses_neutral_style() {
        let prompt = generate_system_prompt(&UserProfile::empty(), None);
        assert!(prompt.contains("hablas como un español (natural, amigable)"));
        assert!(prompt.contains("- Edad: Similar a adulto"));
        assert!(prompt.contains("Pregunta su nombre"));
        assert!(prompt.contains("averiguar su edad"));
        assert!(prompt.trim_end().ends_with("¡Ahora conversa naturalmente!"));
    }

    #[test]
    fn support_modes_replace_identity_and_raise_alert() {
        let emotional = EmotionalState {
            recommended_mode: "crisis".to_string(),
            support_needed: "urgent".to_string(),
            detected_concerns: vec![
                "desesperanza".to_string(),
                "aislamiento".to_string(),
                "insomnio".to_string(),
            ],
            ..EmotionalState::default()
        };
        let prompt =
            generate_system_prompt(&profile_with_age("~30 años"), Some(&emotional));

        assert!(prompt.starts_with(SUPPORT_IDENTITY));
        assert!(prompt.contains("🚨 ALERTA ACTUAL: desesperanza, aislamiento"));
        assert!(!prompt.contains("insomnio"));
    }

    #[test]
    fn moderate_support_has_no_alert() {
        let emotional = EmotionalState {
            recommended_mode: "friendly".to_string(),
            support_needed: "moderate".to_string(),
            detected_concerns: vec!["estrés".to_string()],
            ..EmotionalState::default()
        };
        let prompt =
            generate_system_prompt(&profile_with_age("~30 años"), Some(&emotional));
        assert!(!prompt.contains("ALERTA ACTUAL"));
        assert!(prompt.starts_with("IDENTIDAD Y ROL:\nEres alguien de tu edad."));
    }

    #[test]
    fn summary_lists_only_known_fields() {
        let profile = UserProfile {
            gender: Some("femenino".to_string()),
            political_stance: PoliticalStance {
                spectrum: Some("centro".to_string()),
                intensity: None,
                approach: Some("avoid".to_string()),
            },
            religion: Religion {
                faith: Some("budista".to_string()),
                intensity: Some("poco religioso".to_string()),
                approach: Some("engage".to_string()),
            },
            sensitive_topics: vec!["divorcio".to_string()],
            ..UserProfile::empty()
        };
        let summary = profile_summary(&profile);

        assert!(summary.contains("👤 Género: femenino"));
        assert!(!summary.contains("Edad:"));
        assert!(!summary.contains("INTERESES"));
        assert!(summary.contains("Tendencia: centro (intensidad: moderado)"));
        assert!(summary.contains("EVITA temas políticos"));
        assert!(summary.contains("Fe: budista (poco religioso)"));
        assert!(summary.contains("referencias apropiadas a su fe"));
        assert!(summary.contains("   • divorcio"));
    }

    #[test]
    fn ambiguous_gender_asks_occupation_not_profession() {
        let profile = UserProfile {
            name: Some("Alex".to_string()),
            age_range: Some("~35 años (adulto)".to_string()),
            gender: Some("ambiguo".to_string()),
            ..UserProfile::empty()
        };
        let missing = missing_info(&profile);
        assert_eq!(
            missing,
            vec![MissingInfo::AmbiguousGender, MissingInfo::AdultInterests]
        );
    }

    #[test]
    fn children_are_asked_about_school() {
        let profile = UserProfile {
            name: Some("Leo".to_string()),
            age_range: Some("~9 años (niño)".to_string()),
            interests: vec!["Minecraft".to_string()],
            ..UserProfile::empty()
        };
        assert_eq!(
            missing_info(&profile),
            vec![MissingInfo::SchoolGrade, MissingInfo::KidInterests]
        );
    }

    #[test]
    fn women_are_asked_about_family() {
        let profile = UserProfile {
            name: Some("Marta".to_string()),
            age_range: Some("~38 años".to_string()),
            gender: Some("femenino".to_string()),
            profession: Some("arquitecta".to_string()),
            interests: vec!["yoga".to_string(), "cine".to_string()],
            ..UserProfile::empty()
        };
        assert_eq!(missing_info(&profile), vec![MissingInfo::FamilyStatusFemale]);

        let complete = UserProfile {
            gender: Some("masculino".to_string()),
            ..profile
        };
        assert!(proactive_questions(&complete).is_empty());
    }
}

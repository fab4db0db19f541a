use crate::places::Place;
use crate::prompts::PromptBook;
use crate::text::Language;

const MAX_LISTED: usize = 3;
const SUMMARY_CHARS: usize = 100;

pub const OUT_OF_SCOPE: &str =
    "น้องปลาทูจะให้ข้อมูลได้ชัดเจนและครอบคลุม หากถามข้อมูลในจังหวัดสมุทรสงครามค่ะ ขออภัยด้วยนะคะ";

pub const PERSONA_SYSTEM_HINT: &str = "คุณคือน้องปลาทู แอดมิน AI ผู้ช่วยแนะนำการท่องเที่ยวจังหวัดสมุทรสงคราม \
     ตอนนี้ฐานข้อมูลภายในยังไม่พร้อม ให้ตอบโดยใช้ความรู้ทั่วไปและรักษาคาแรกเตอร์ที่อบอุ่น เป็นมิตร และช่วยเหลือดี";

pub fn empty_query(prompts: &PromptBook, language: Language) -> String {
    prompts.prompt(
        language,
        &["empty_query"],
        "กรุณาพิมพ์คำถามเกี่ยวกับการท่องเที่ยวในสมุทรสงครามนะคะ",
        "Please share a travel question for Samut Songkhram.",
    )
}

pub fn static_persona(language: Language) -> &'static str {
    language.pick(
        "สวัสดีค่ะ น้องปลาทูขออภัย ฐานข้อมูลยังไม่พร้อมใช้งานตอนนี้ \
         หากต้องการสถานที่เที่ยว แนะนำให้ลองระบุกลุ่มสถานที่หรือบรรยากาศที่สนใจค่ะ",
        "Hi! The internal database is currently unavailable. \
         If you share the type of place or vibe you want, I can still help.",
    )
}

fn join_three(items: &[String]) -> String {
    items.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
}

fn description_of(place: &Place) -> &str {
    if place.description.is_empty() {
        &place.place_information.detail
    } else {
        &place.description
    }
}

fn detail_card(place: &Place, language: Language) -> String {
    let th = language == Language::Th;
    let label = |t: &'static str, e: &'static str| if th { t } else { e };
    let mut lines = vec![format!("🌟 **{}**", place.display_name())];

    if let Some(kind) = place.attraction_type.as_deref().filter(|k| !k.is_empty()) {
        lines.push(format!("📂 {}: {}", label("ประเภท", "Type"), kind));
    }
    if let Some(area) = place.area() {
        lines.push(format!("📍 {}: {}", label("พื้นที่", "Area"), area));
    }
    if let Some(rating) = place.rating {
        lines.push(format!("⭐ {}: {}", label("คะแนน", "Rating"), rating));
    }
    let description = description_of(place);
    if !description.is_empty() {
        lines.push(format!("\n📖 **{}**: {}", label("เรื่องราว", "About"), description));
    }
    if !place.highlights.is_empty() {
        lines.push(format!("\n✨ **{}**: {}", label("ไฮไลต์", "Highlights"), join_three(&place.highlights)));
    }
    if let Some(hours) = &place.opening_hours {
        lines.push(format!("\n⏰ **{}**: {}", label("เวลา", "Hours"), hours));
    }
    if let Some(price) = &place.price_range {
        lines.push(format!("💰 **{}**: {}", label("ค่าใช้สอย", "Cost"), price));
    }
    if let Some(address) = place.address.as_deref().filter(|a| !a.is_empty()) {
        lines.push(format!("📮 **{}**: {}", label("ที่ตั้ง", "Address"), address));
    }
    if let Some(best_time) = &place.best_time {
        lines.push(format!("\n🌤️ **{}**: {}", label("เวลาที่ดี", "Best Time"), best_time));
    }
    if !place.tips.is_empty() {
        lines.push(format!("\n💡 **{}**: {}", label("เคล็ดลับ", "Tips"), join_three(&place.tips)));
    }
    lines.join("\n")
}

fn compact_entry(place: &Place, idx: usize, language: Language) -> String {
    let mut lines = vec![format!("{}. {}", idx, place.display_name())];
    if let Some(area) = place.area() {
        lines.push(format!("   📍 {}: {}", language.pick("พื้นที่", "Area"), area));
    }
    let description = description_of(place);
    if !description.is_empty() {
        let mut summary: String = description.chars().take(SUMMARY_CHARS).collect();
        if description.chars().count() > SUMMARY_CHARS {
            summary.push_str("...");
        }
        lines.push(format!("   {}: {}", language.pick("จุดเด่น", "Why visit"), summary));
    }
    if !place.highlights.is_empty() {
        lines.push(format!("   ✨ {}", join_three(&place.highlights)));
    }
    if let Some(best_time) = &place.best_time {
        lines.push(format!("   ⏰ {}", best_time));
    }
    lines.join("\n")
}

/// Answer built from catalog data alone, used when no model is available.
pub fn create_simple_response(
    prompts: &PromptBook,
    places: &[Place],
    language: Language,
    is_specific_place: bool,
) -> String {
    if places.is_empty() {
        return prompts.prompt(
            language,
            &["simple_response", "no_data"],
            "น้องปลาทูพร้อมให้ข้อมูลการท่องเที่ยวสมุทรสงครามให้คุณนะคะ \
             ลองถามเกี่ยวกับสถานที่ท่องเที่ยว ร้านอาหาร หรือที่พักในสมุทรสงครามได้เลยค่ะ \
             (ขออภัยที่ตอนนี้ยังไม่พบข้อมูลที่ตรงกับคำถามในฐานข้อมูล)",
            "I'm ready to provide tourism information about Samut Songkhram. \
             Feel free to ask about attractions, restaurants, or accommodations! \
             (Sorry, no matching data found in the database right now)",
        );
    }

    let intro = prompts
        .prompt(
            language,
            &["simple_response", "intro"],
            "“น้องปลาทู” ได้เตรียมข้อมูลจากฐานข้อมูลสมุทรสงครามมาให้ {count} สถานที่ค่ะ \
             รายละเอียดแต่ละจุดอยู่ด้านล่างเลยนะคะ:",
            "Here are {count} verified Samut Songkhram spots that match your question. \
             Check the details below:",
        )
        .replace("{count}", &places.len().to_string());
    let outro = prompts.prompt(
        language,
        &["simple_response", "outro"],
        "\nหากต้องการข้อมูลเพิ่มเติม สามารถถามเพิ่มได้เลยค่ะ 😊",
        "\nFeel free to ask for more information! 😊",
    );

    if is_specific_place && places.len() == 1 {
        return format!("{}\n\n{}{}", intro, detail_card(&places[0], language), outro);
    }

    let body = places
        .iter()
        .take(MAX_LISTED)
        .enumerate()
        .map(|(i, place)| compact_entry(place, i + 1, language))
        .collect::<Vec<_>>()
        .join("\n\n");
    let remaining = places.len().saturating_sub(MAX_LISTED);
    let more = match (remaining, language) {
        (0, _) => String::new(),
        (n, Language::Th) => format!("\n... และยังมีอีก {} สถานที่ที่เกี่ยวข้องค่ะ", n),
        (n, Language::En) => format!("\n... plus {} more related places.", n),
    };
    format!("{}\n\n{}{}{}", intro, body, more, outro)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::places::catalog::tests::sample_places;

    #[test]
    fn no_data_uses_prompt_default() {
        let text = create_simple_response(&PromptBook::default(), &[], Language::En, false);
        assert!(text.starts_with("I'm ready to provide tourism information"));
    }

    #[test]
    fn single_specific_place_gets_detail_card() {
        let places = sample_places();
        let text = create_simple_response(&PromptBook::default(), &places[..1], Language::Th, true);
        assert!(text.contains("🌟 **ตลาดน้ำอัมพวา**"));
        assert!(text.contains("📍 พื้นที่: อัมพวา"));
        assert!(text.contains("1 สถานที่"));
    }

    #[test]
    fn list_caps_at_three_with_remaining_note() {
        let places = sample_places();
        let text = create_simple_response(&PromptBook::default(), &places[..5], Language::En, false);
        assert!(text.starts_with("Here are 5 verified"));
        assert!(text.contains("3. วัดบางกุ้ง"));
        assert!(!text.contains("4. "));
        assert!(text.contains("... plus 2 more related places."));
        assert!(text.ends_with("Feel free to ask for more information! 😊"));
    }

    #[test]
    fn long_descriptions_are_shortened() {
        let mut place = sample_places().remove(1);
        place.description = "x".repeat(150);
        let entry = compact_entry(&place, 1, Language::En);
        assert!(entry.contains(&format!("Why visit: {}...", "x".repeat(100))));
    }
}

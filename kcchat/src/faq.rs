use crate::models::portal::FaqEntry;

const BUILTIN_FAQS: &[(u64, &str, &str, &str)] = &[
    (
        1,
        "enrollment",
        "What are your enrollment requirements?",
        "To enroll your child, you need: Birth Certificate, Immunization Records, 2x2 ID Photos (4pcs), Health Certificate, and filled-out enrollment form. Please visit our office during enrollment period.",
    ),
    (
        2,
        "schedule",
        "What are your class schedules?",
        "Our kindergarten classes run from 8:00 AM to 12:00 PM, Monday to Friday. Extended care is available until 3:00 PM for working parents.",
    ),
    (
        3,
        "attendance",
        "What is your attendance policy?",
        "Regular attendance is important for your child's development. Please notify us if your child will be absent. Excused absences require a parent note or medical certificate.",
    ),
    (
        4,
        "faq",
        "What should I do if my child is sick?",
        "Please keep your child at home if they have fever, cough, or any contagious illness. They may return 24 hours after symptoms subside. Always inform the teacher about any medical conditions.",
    ),
    (
        5,
        "contact",
        "How can I contact the school?",
        "You can reach us at: Phone: (074) 424-xxxx, Email: kindercare@school.edu.ph, Office Hours: Monday-Friday, 7:30 AM - 4:30 PM",
    ),
    (
        6,
        "records",
        "How can I view my child's progress?",
        "You can view your child's competency records and attendance through your parent dashboard. Reports are updated quarterly and you'll receive notifications when new assessments are posted.",
    ),
    (
        7,
        "general",
        "What items should my child bring to school?",
        "Your child should bring: Clean uniform, Snack and water bottle, Extra clothes, Handkerchief/tissue, School bag. Please label all items with your child's name.",
    ),
    (
        8,
        "general",
        "What is your payment schedule?",
        "Tuition fees can be paid monthly or quarterly. Monthly payments are due on the 5th of each month. We accept cash, check, and bank transfer. Please see the accounting office for payment arrangements.",
    ),
    (
        9,
        "schedule",
        "What is your cancellation policy for classes?",
        "Classes are cancelled during typhoons, holidays, and emergencies. We will send announcements through the parent portal and SMS. Make-up classes will be scheduled as needed.",
    ),
    (
        10,
        "contact",
        "How do I update my contact information?",
        "You can update your contact information through your Profile page or visit the school office. It's important to keep your contact details current for emergency situations.",
    ),
];

/// FAQ catalog shipped with the client, used until the server catalog loads
/// and whenever it cannot be fetched.
pub fn builtin_catalog() -> Vec<FaqEntry> {
    BUILTIN_FAQS
        .iter()
        .map(|(id, category, question, answer)| FaqEntry {
            id: *id,
            question: question.to_string(),
            answer: answer.to_string(),
            category: category.to_string(),
        })
        .collect()
}

pub fn find(catalog: &[FaqEntry], id: u64) -> Option<&FaqEntry> {
    catalog.iter().find(|faq| faq.id == id)
}

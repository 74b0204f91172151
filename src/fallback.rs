//! Canned reply decision tables.
//!
//! Each persona owns an ordered rule list. The first rule whose condition
//! holds wins; every table ends with an `Always` rule. Message keywords are
//! matched against the lower-cased user text, context markers against the
//! lower-cased recent-history string, so a persona can keep escalating a
//! storyline that is already running instead of starting a new one.

use crate::personas::{
    CHAOS_ENGINEER, COMEBACK_COACH, LEARNING_ASSISTANT, MIND_READER, SCENARIO_MASTER,
};
use crate::session::SessionContext;

#[derive(Debug)]
pub enum Condition {
    /// Lower-cased user text contains any keyword
    MessageAny(&'static [&'static str]),
    /// Lower-cased recent history contains any marker
    ContextAny(&'static [&'static str]),
    /// Every sub-condition holds
    All(&'static [Condition]),
    Always,
}

impl Condition {
    /// `None` when the condition fails, otherwise the message keyword that
    /// satisfied it (if any)
    fn check(&self, message: &str, context: &str) -> Option<Option<&'static str>> {
        match self {
            Condition::MessageAny(keywords) => keywords
                .iter()
                .find(|k| contains_keyword(message, k))
                .map(|k| Some(*k)),
            Condition::ContextAny(markers) => markers
                .iter()
                .any(|m| context.contains(m))
                .then_some(None),
            Condition::All(conditions) => {
                let mut matched = None;
                for condition in conditions.iter() {
                    let hit = condition.check(message, context)?;
                    matched = matched.or(hit);
                }
                Some(matched)
            }
            Condition::Always => Some(None),
        }
    }
}

/// Multi-word keywords also match when typed without spaces ("apigateway")
fn contains_keyword(message: &str, keyword: &str) -> bool {
    message.contains(keyword)
        || (keyword.contains(' ') && message.contains(&keyword.replace(' ', "")))
}

#[derive(Debug)]
pub struct Rule {
    pub name: &'static str,
    pub when: Condition,
    /// Placeholders: `{input}` raw user text, `{matched}` / `{MATCHED}` the hit keyword
    pub reply: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackReply {
    pub rule: &'static str,
    pub text: String,
}

const GENERIC_REPLY: &str = "I'm here to help! What would you like to work on?";

/// Evaluate a rule table top to bottom.
///
/// `_session` is the session's free-form context map. No rule reads it yet.
pub fn evaluate(
    rules: &[Rule],
    message: &str,
    context: &str,
    _session: &SessionContext,
) -> FallbackReply {
    let lower_message = message.to_lowercase();
    let lower_context = context.to_lowercase();

    for rule in rules {
        if let Some(matched) = rule.when.check(&lower_message, &lower_context) {
            return FallbackReply {
                rule: rule.name,
                text: render(rule.reply, message, matched),
            };
        }
    }

    FallbackReply {
        rule: "default",
        text: GENERIC_REPLY.to_string(),
    }
}

fn render(template: &str, input: &str, matched: Option<&str>) -> String {
    let matched = matched.unwrap_or_default();
    template
        .replace("{input}", input)
        .replace("{matched}", matched)
        .replace("{MATCHED}", &matched.to_uppercase())
}

pub fn rules_for(persona_id: &str) -> &'static [Rule] {
    match persona_id {
        LEARNING_ASSISTANT => LEARNING_RULES,
        SCENARIO_MASTER => SCENARIO_RULES,
        COMEBACK_COACH => CAREER_RULES,
        CHAOS_ENGINEER => CHAOS_RULES,
        MIND_READER => ANALYTICAL_RULES,
        _ => GENERIC_RULES,
    }
}

static GENERIC_RULES: &[Rule] = &[Rule {
    name: "default",
    when: Condition::Always,
    reply: GENERIC_REPLY,
}];

const COMPARE: Condition = Condition::MessageAny(&["difference", "vs", "compare"]);

static LEARNING_RULES: &[Rule] = &[
    Rule {
        name: "ec2",
        when: Condition::MessageAny(&["ec2"]),
        reply: "**Amazon EC2 (Elastic Compute Cloud)** 🖥️\n\n\
EC2 gives you resizable virtual servers. Pick an instance family by workload: t3 for learning and small sites, \
m5 for balanced web apps, c5 for CPU-heavy work, r5 for memory-heavy work.\n\n\
**Cost tips:** Reserved Instances (up to 72% off), Spot for fault-tolerant jobs (up to 90% off), Auto Scaling to track demand.\n\n\
**Next steps:** want to dig into instance types, Auto Scaling, or Load Balancers?",
    },
    Rule {
        name: "s3",
        when: Condition::MessageAny(&["s3"]),
        reply: "**Amazon S3 (Simple Storage Service)** 🗄️\n\n\
Objects in buckets with eleven nines of durability. Storage classes trade price for retrieval speed: \
Standard, Standard-IA, Glacier Instant, Glacier Deep Archive.\n\n\
**Worth learning:** versioning, lifecycle policies, cross-region replication, static website hosting. \
Keep buckets private, enable encryption, and hand out pre-signed URLs for temporary access.\n\n\
What S3 feature do you want to implement?",
    },
    Rule {
        name: "lambda",
        when: Condition::MessageAny(&["lambda"]),
        reply: "**AWS Lambda: Serverless Computing** ⚡\n\n\
Run code without provisioning servers and pay per millisecond of execution. \
Typical triggers: API Gateway requests, S3 uploads, DynamoDB streams, scheduled events.\n\n\
**Watch out for:** the 15-minute limit, cold starts, and package size. \
Want a walkthrough of building an API with Lambda and API Gateway?",
    },
    Rule {
        name: "rds",
        when: Condition::MessageAny(&["rds", "database"]),
        reply: "**Amazon RDS (Relational Database Service)** 🗃️\n\n\
Managed MySQL, PostgreSQL, MariaDB, Oracle, SQL Server and Aurora. AWS handles patching, backups and failover.\n\n\
**Key features:** Multi-AZ for high availability, read replicas for scale, automated snapshots. \
Consider DynamoDB when you need key-value access at massive scale.\n\n\
Which engine are you planning to use?",
    },
    Rule {
        name: "vpc",
        when: Condition::MessageAny(&["vpc", "network"]),
        reply: "**Amazon VPC (Virtual Private Cloud)** 🌐\n\n\
Your own isolated network: public subnets for load balancers, private subnets for apps and databases, \
NAT gateways for outbound traffic, security groups and NACLs for filtering.\n\n\
Want a standard three-tier VPC layout to start from?",
    },
    Rule {
        name: "certification",
        when: Condition::MessageAny(&["certification", "exam", "study"]),
        reply: "**AWS Certification Strategy** 🎯\n\n\
Start with Cloud Practitioner if you're new, then Solutions Architect Associate. \
Study plan: official exam guide, hands-on labs every week, practice exams until you score 80%+.\n\n\
Which certification are you aiming for, and when?",
    },
    Rule {
        name: "architecture",
        when: Condition::MessageAny(&["architecture", "design", "pattern"]),
        reply: "**AWS Architecture Design Patterns** 🏗️\n\n\
Common starting points: three-tier web apps, serverless APIs, event-driven pipelines, and static sites behind CloudFront. \
Measure every design against the Well-Architected pillars: reliability, security, cost, performance, operations, sustainability.\n\n\
What are you trying to build?",
    },
    Rule {
        name: "cloudformation",
        when: Condition::MessageAny(&["cloudformation", "iac"]),
        reply: "**AWS CloudFormation: Infrastructure as Code** 📋\n\n\
Describe resources in YAML or JSON templates and deploy them as stacks. Use parameters for environments, \
outputs to share values, and change sets to preview updates. CDK and Terraform are worth knowing too.\n\n\
Want a starter template?",
    },
    Rule {
        name: "iam",
        when: Condition::MessageAny(&["iam", "security", "permissions"]),
        reply: "**AWS IAM (Identity and Access Management)** 🔐\n\n\
Users, groups, roles and policies. Grant least privilege, prefer roles over long-lived keys, \
enable MFA everywhere, and never use the root account day to day.\n\n\
Which access problem are you solving?",
    },
    Rule {
        name: "getting-started",
        when: Condition::MessageAny(&["start", "begin", "learn", "new"]),
        reply: "**AWS Learning Path: From Zero to Cloud Professional** 🚀\n\n\
1. Create a free-tier account and set up billing alerts\n\
2. Learn the core five: EC2, S3, IAM, VPC, RDS\n\
3. Build and deploy a small web app end to end\n\
4. Add serverless pieces with Lambda and API Gateway\n\
5. Prepare for the Solutions Architect Associate exam\n\n\
Where are you on this path right now?",
    },
    Rule {
        name: "cost",
        when: Condition::MessageAny(&["cost", "price", "billing"]),
        reply: "**AWS Pricing and Cost Optimization** 💰\n\n\
Set budgets and alerts first. Then right-size instances, buy Savings Plans for steady workloads, \
use Spot for batch jobs, move cold data to cheaper storage classes, and delete idle resources.\n\n\
What does your current bill look like?",
    },
    Rule {
        name: "compare-ec2-lambda",
        when: Condition::All(&[
            COMPARE,
            Condition::MessageAny(&["ec2"]),
            Condition::MessageAny(&["lambda"]),
        ]),
        reply: "**EC2 vs Lambda: When to Use Each** ⚖️\n\n\
**EC2:** long-running processes, full OS control, steady high traffic, workloads over 15 minutes.\n\
**Lambda:** event-driven work, spiky traffic, short tasks, pay-per-invocation with zero idle cost.\n\n\
Rule of thumb: start serverless, move to EC2 when execution time, cost at scale, or runtime control demands it.",
    },
    Rule {
        name: "compare-storage",
        when: Condition::All(&[
            COMPARE,
            Condition::MessageAny(&["s3"]),
            Condition::MessageAny(&["ebs", "efs"]),
        ]),
        reply: "**AWS Storage Comparison: S3 vs EBS vs EFS** 💾\n\n\
- **S3:** object storage for static assets, backups, data lakes, websites\n\
- **EBS:** block storage attached to one instance, for databases and boot volumes\n\
- **EFS:** shared NFS file system for content repositories and shared application data",
    },
    Rule {
        name: "service-catalog",
        when: Condition::MessageAny(&[
            "cloudfront", "route53", "dynamodb", "sqs", "sns", "kinesis", "redshift",
            "elasticache", "api gateway", "cognito", "cloudwatch",
        ]),
        reply: "I can help you with {MATCHED}! This is a powerful AWS service with many use cases.\n\n\
To give you the most helpful information, tell me:\n\
- What specific aspect of {matched} interests you?\n\
- Are you implementing it for a particular use case?\n\
- Do you need help with setup, configuration, or best practices?\n\n\
What would you like to know about {matched}?",
    },
    Rule {
        name: "aws-general",
        when: Condition::MessageAny(&["aws", "amazon", "cloud"]),
        reply: "I'm here to help with your AWS question!\n\n\
Could you be more specific? Popular topics: specific services (EC2, S3, Lambda, RDS, VPC), architecture design, \
cost optimization, security best practices, certification prep, and getting started.\n\n\
What AWS topic would you like to explore?",
    },
    Rule {
        name: "default",
        when: Condition::Always,
        reply: "I'm your AWS Learning Assistant, specialized in helping you master Amazon Web Services!\n\n\
Your question might not be AWS-related. I can help with AWS services, cloud architecture, certification prep, \
cost optimization, security, and beginner tutorials.\n\n\
Try asking \"How do I get started with AWS?\" or \"Explain S3 storage classes\".",
    },
];

static SCENARIO_RULES: &[Rule] = &[
    Rule {
        name: "database-bottleneck",
        when: Condition::MessageAny(&["database", "query"]),
        reply: "Good thinking! You're focusing on the database bottleneck.\n\n\
**Follow-up Crisis:** the slow query is on the `user_sessions` table. It normally takes 50ms, now 8+ seconds. \
The query hasn't changed, but something in the environment has.\n\n\
**New evidence:**\n\
- The query plan shows a full table scan instead of the index\n\
- The index exists and shows as valid\n\
- This started exactly 3 hours ago, with no deployments or schema changes\n\n\
**Your next move:** why would a working index suddenly stop being used? You have 10 minutes before the CEO calls.",
    },
    Rule {
        name: "escalate-scenario",
        when: Condition::ContextAny(&["scenario", "crisis"]),
        reply: "I see you're working through the scenario. Let me escalate the pressure:\n\n\
**PLOT TWIST:** while you were investigating, the error rate jumped from 15% to 45%. \
Support is flooded and social media mentions are spiking.\n\n\
**New constraint:** you have 5 minutes to ship a quick fix that stops the bleeding, even if it isn't the perfect solution.\n\n\
What's your emergency response strategy?",
    },
    Rule {
        name: "midnight-meltdown",
        when: Condition::MessageAny(&["debug", "error", "problem"]),
        reply: "🚨 **CRISIS SCENARIO: The Midnight Meltdown**\n\n\
It's 11:47 PM on a Friday. The main API is throwing 500 errors at a 25% rate and the on-call engineer escalated to you.\n\n\
**The situation:**\n\
- Revenue is dropping $2K per minute\n\
- Last deployment was 3 days ago\n\
- Database CPU 45%, app server memory normal, health checks passing\n\
- Error logs: \"Connection timeout after 30 seconds\"\n\n\
You have 15 minutes to find the root cause. What's your first move and why?",
    },
    Rule {
        name: "default",
        when: Condition::Always,
        reply: "Ready for some real-world chaos? I don't do easy problems, only scenarios that make you sweat and think fast.\n\n\
**Choose your disaster:**\n\
🚨 System failures\n\
🔒 Security breaches\n\
🤖 AI gone wrong\n\
⚡ Performance nightmares\n\n\
Or tell me about a real problem you're facing, and I'll throw you into a similar scenario.",
    },
];

static CAREER_RULES: &[Rule] = &[
    Rule {
        name: "dig-deeper",
        when: Condition::ContextAny(&["rejection", "interview"]),
        reply: "I can see this is really affecting you. Let's dig into the specifics so I can build a targeted comeback strategy.\n\n\
**I need the brutal details:**\n\
- Exact role title and company size?\n\
- How many rounds did you complete?\n\
- What feedback did they give you, even the generic HR speak?\n\
- What's your gut feeling about what went wrong?\n\n\
Generic problems get generic solutions, and I don't do generic.",
    },
    Rule {
        name: "rejection-recovery",
        when: Condition::MessageAny(&["reject", "didn", "turned down", "give up"]),
        reply: "I hear you. Job rejection hits hard. But **giving up is not an option when you have potential.**\n\n\
**Immediate action plan:**\n\
1. Take 24-48 hours to feel disappointed\n\
2. Get specific details about what happened\n\
3. Separate real gaps from perceived ones\n\
4. Build a targeted improvement plan\n\
5. Come back with a better strategy\n\n\
Tell me exactly what happened: company, role, process, feedback.",
    },
    Rule {
        name: "career-menu",
        when: Condition::MessageAny(&["career", "job", "work"]),
        reply: "Career challenges are my specialty, from rejections to pivots to salary negotiations.\n\n\
**What's eating at you right now?**\n\
- A rejection crushing your confidence?\n\
- Stuck in a role with no growth?\n\
- Breaking into a new field and getting nowhere?\n\
- Imposter syndrome, or a negotiation you're dreading?\n\n\
Be specific. The more details you give me, the more targeted my advice will be.",
    },
    Rule {
        name: "default",
        when: Condition::Always,
        reply: "I specialize in turning career disasters into career breakthroughs. Whether you've been rejected, \
passed over, or just feel stuck, I've got strategies most people never consider.\n\n\
Tell me what's going on, and I'll help you build a plan to overcome it.",
    },
];

static CHAOS_RULES: &[Rule] = &[
    Rule {
        name: "resilience-engine",
        when: Condition::ContextAny(&["project", "challenge"]),
        reply: "I can see you're ready to embrace the chaos. Here's your personalized project:\n\n\
**🌪️ \"The Resilience Engine\": 90 Day Challenge**\n\n\
Build a distributed system designed to fail spectacularly, then make it bulletproof. \
Every service gets at least 3 failure modes, database connections drop every 30 minutes, \
and network partitions hit every few hours. Your job: serve 10,000+ concurrent users anyway.\n\n\
- Days 1-30: build the broken system\n\
- Days 31-60: add circuit breakers, retries, fallbacks\n\
- Days 61-90: load test and document like a senior engineer\n\n\
Ready to commit, or do you want to stay comfortable building todo apps?",
    },
    Rule {
        name: "failure-factory",
        when: Condition::MessageAny(&["junior", "beginner", "entry"]),
        reply: "Junior level? Perfect. Controlled chaos can accelerate your growth by 2-3 years.\n\n\
**🔥 Your Chaos Project: \"The Failure Factory\"**\n\n\
Build an e-commerce system where everything is designed to fail: payments crash every 100 transactions, \
the catalog randomly returns nothing, the CDN 404s on 10% of images. Customers must still be able to buy.\n\n\
**Success metric:** Black Friday traffic with 3 services down.\n\n\
This will either make you a mid-level engineer or break you trying. Which outcome scares you more?",
    },
    Rule {
        name: "default",
        when: Condition::Always,
        reply: "I don't believe in gentle learning curves. I believe in \"Chaos Projects\": challenges just beyond your current abilities.\n\n\
**Tell me your current level:** junior, mid-level, senior, or already leading?\n\
**Also tell me:** what you work with daily, the most complex thing you've built, and what scares you about the next level.\n\n\
Ready to embrace the chaos?",
    },
];

static ANALYTICAL_RULES: &[Rule] = &[
    Rule {
        name: "follow-up-probe",
        when: Condition::ContextAny(&["probe", "assessment"]),
        reply: "Interesting response. Let me dig deeper into how your mind works.\n\n\
**🧠 Follow-up Probe:**\n\
**Option A:** a proven solution that will definitely work but takes 3 months\n\
**Option B:** a cutting-edge approach done in 1 month with a 30% chance of failure\n\n\
Your manager wants the faster option and your team is split 50/50.\n\n\
What's your instinctive choice and why? It shows whether you're risk-averse, innovation-driven, \
team-focused, or authority-responsive.",
    },
    Rule {
        name: "cognitive-probe",
        when: Condition::MessageAny(&["test", "assess", "strength"]),
        reply: "Forget traditional aptitude tests. I'm going to probe how your mind works under pressure.\n\n\
**🎯 COGNITIVE PROBE #1: The Impossible Deadline**\n\n\
A critical system is failing and you have 2 hours. You can investigate only ONE first:\n\
A) Server logs (10GB of messy data)\n\
B) Database metrics (clean and quick to read)\n\
C) User complaints (unstructured, shows real impact)\n\
D) Interview the last developer who touched it\n\n\
What's your instinctive choice and why?",
    },
    Rule {
        name: "default",
        when: Condition::Always,
        reply: "I analyze thinking patterns, not memorized knowledge.\n\n\
I can reveal your natural problem-solving style, which tech domains match how you think, \
and hidden aptitudes you might not know you have.\n\n\
Start with thinking probes, analyze a real problem you're stuck on, or map your career aptitude. Which sounds best?",
    },
];

/// Pick the canned reply for one persona.
pub fn generate(
    persona_id: &str,
    message: &str,
    context: &str,
    session: &SessionContext,
) -> FallbackReply {
    evaluate(rules_for(persona_id), message, context, session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(persona: &str, message: &str, context: &str) -> FallbackReply {
        generate(persona, message, context, &SessionContext::new())
    }

    #[test]
    fn every_table_ends_with_catch_all() {
        let tables = [
            LEARNING_RULES,
            SCENARIO_RULES,
            CAREER_RULES,
            CHAOS_RULES,
            ANALYTICAL_RULES,
            GENERIC_RULES,
        ];
        for table in tables {
            let last = table.last().unwrap();
            assert!(matches!(last.when, Condition::Always));
            assert_eq!(last.name, "default");
        }
    }

    #[test]
    fn database_issue_gets_bottleneck_branch_without_prior_scenario() {
        let text = "I think it's a database issue";
        let r = reply(SCENARIO_MASTER, text, &format!("user: {}", text));
        assert_eq!(r.rule, "database-bottleneck");
        assert!(r.text.contains("database bottleneck"));
    }

    #[test]
    fn running_scenario_escalates_instead_of_restarting() {
        let text = "I'd check the logs for errors";
        let context = format!(
            "assistant: 🚨 **CRISIS SCENARIO: The Midnight Meltdown**\nuser: {}",
            text
        );
        let r = reply(SCENARIO_MASTER, text, &context);
        assert_eq!(r.rule, "escalate-scenario");

        let fresh = reply(SCENARIO_MASTER, text, &format!("user: {}", text));
        assert_eq!(fresh.rule, "midnight-meltdown");
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(reply(LEARNING_ASSISTANT, "Tell me about EC2", "").rule, "ec2");
        assert_eq!(reply(MIND_READER, "What is my STRENGTH?", "").rule, "cognitive-probe");
    }

    #[test]
    fn first_match_wins() {
        // "lambda" and "cost" both match; lambda sits higher
        assert_eq!(reply(LEARNING_ASSISTANT, "lambda cost", "").rule, "lambda");
        // single-service rules sit above the comparisons
        assert_eq!(reply(LEARNING_ASSISTANT, "ec2 vs lambda", "").rule, "ec2");
        assert_eq!(reply(LEARNING_ASSISTANT, "compare s3 and efs", "").rule, "s3");
    }

    #[test]
    fn service_catalog_interpolates_the_service() {
        let r = reply(LEARNING_ASSISTANT, "how does dynamodb scale", "");
        assert_eq!(r.rule, "service-catalog");
        assert!(r.text.starts_with("I can help you with DYNAMODB!"));
        assert!(r.text.contains("aspect of dynamodb"));
    }

    #[test]
    fn spaced_service_names_match_without_spaces() {
        for text in ["set up api gateway", "set up apigateway"] {
            let r = reply(LEARNING_ASSISTANT, text, "");
            assert_eq!(r.rule, "service-catalog");
            assert!(r.text.starts_with("I can help you with API GATEWAY!"));
        }
    }

    #[test]
    fn context_markers_drive_career_follow_up() {
        let context = "user: I had an interview last week\nuser: it was a startup";
        let r = reply(COMEBACK_COACH, "it was a startup", context);
        assert_eq!(r.rule, "dig-deeper");
        let turned_down = reply(COMEBACK_COACH, "they turned down my offer", "");
        assert_eq!(turned_down.rule, "rejection-recovery");
        assert_eq!(reply(COMEBACK_COACH, "hello", "").rule, "default");
    }

    #[test]
    fn chaos_engineer_rules() {
        assert_eq!(reply(CHAOS_ENGINEER, "I'm a beginner", "").rule, "failure-factory");
        let r = reply(CHAOS_ENGINEER, "ok", "user: give me a challenge");
        assert_eq!(r.rule, "resilience-engine");
    }

    #[test]
    fn unknown_persona_gets_generic_reply() {
        let r = reply("ghost-writer", "anything", "");
        assert_eq!(r.rule, "default");
        assert_eq!(r.text, GENERIC_REPLY);
    }

    #[test]
    fn same_input_selects_same_rule() {
        let a = reply(MIND_READER, "give me a test", "user: give me a test");
        let b = reply(MIND_READER, "give me a test", "user: give me a test");
        assert_eq!(a, b);
    }
}

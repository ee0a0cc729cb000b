//! Static schema description handed to the query composer.
//!
//! The pipeline treats this as opaque text; swap it out via
//! [`crate::orchestrator::Orchestrator::with_schema`] for other datasets.

/// Human-readable description of the list-management tables and views.
pub const SCHEMA_DESCRIPTION: &str = "\
This database powers a list management and evolution tracking system for
lists of healthcare professionals (HCPs), their versions, business requests,
and related activities.

Core tables:

domains(id, domain_name)
  High-level business domains (e.g. Cardiology, Oncology).

subdomains(id, domain_id, subdomain_name)
  Subdivisions under each domain.

list_requests(id, subdomain_id, requester_name, request_purpose, status,
              assigned_to, created_at)
  A business request for creating or updating a list of HCPs. Answers who
  requested what and why; filter by status or creation date.

list_versions(id, request_id, version_number, change_type, change_rationale,
              created_by, is_current, created_at)
  Numbered versions tracking each request's evolution. Answers how a list
  evolved and who made each change.

target_list_entries(id, version_id, hcp_id, hcp_name, specialty, territory,
                    tier, created_at, updated_at)
  The HCPs in each list version; the core data of a target list.

call_list_entries(id, version_id, hcp_id, hcp_name, call_date, sales_rep,
                  status)
  Planned or completed sales calls to HCPs.

competitor_target_entries(id, version_id, hcp_name, competitor_product,
                          conversion_potential, assigned_rep)
  Competitor engagements with HCPs.

digital_engagement_entries(id, version_id, contact_name, email, specialty,
                           opt_in)
  Digital outreach contacts; respect opt_in in campaigns.

formulary_decision_maker_entries(id, version_id, contact_name, organization,
                                 influence_level)
  Contacts who make formulary or approval decisions.

high_value_prescriber_entries(id, version_id, hcp_name, total_prescriptions,
                              revenue, value_tier)
  HCPs generating high prescription or revenue volume.

idn_health_system_entries(id, version_id, system_name, contact_name,
                          importance)
  Health systems or hospital networks and their key contacts.

work_logs(id, request_id, worker_name, activity_description, decisions_made,
          activity_date)
  Audit trail of who performed which action and when.

Views:

view_target_list_full
  HCP details joined with version metadata. Use for current list or HCP
  questions.

view_list_evolution
  How each list changed over time, with rationale and author. Use for
  historical analysis.

Query hints:
- Current list, latest version, HCPs: view_target_list_full
- Changes, differences, history: view_list_evolution
- Who requested, purpose, assignment: list_requests
- Who made updates, actions taken: work_logs
- Use LIKE with wildcards for user-supplied name fragments.
";
